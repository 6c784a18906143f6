//! In-memory account registry.
//!
//! Holds accounts and their scheduling state as a single ordered collection.
//! Iteration order is insertion order and never changes for surviving
//! entries, so it doubles as the index basis for published status codes.

use thiserror::Error;
use tokio::time::Instant;

use super::types::{Account, AccountEntry, AccountStatus};

/// Errors returned by registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// An account with the same identity is already registered.
    #[error("account already exists: {0}")]
    DuplicateAccount(String),

    /// No account with this identity.
    #[error("account not found: {0}")]
    NotFound(String),

    /// The account currently owns a running worker.
    #[error("account is in use: {0}")]
    InUse(String),

    /// Malformed credentials.
    #[error("invalid account: {0}")]
    InvalidAccount(String),
}

/// Ordered collection of `(Account, status)` entries.
#[derive(Debug, Default)]
pub struct AccountRegistry {
    entries: Vec<AccountEntry>,
}

impl AccountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a list of accounts, rejecting invalid or
    /// duplicate entries.
    pub fn from_accounts(accounts: Vec<Account>) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for account in accounts {
            registry.add(account)?;
        }
        Ok(registry)
    }

    /// Check credentials shape.
    pub fn validate(account: &Account) -> Result<(), RegistryError> {
        let email = account.email.trim();
        if email.is_empty() {
            return Err(RegistryError::InvalidAccount(
                "email cannot be empty".to_string(),
            ));
        }
        if !email.contains('@') {
            return Err(RegistryError::InvalidAccount(format!(
                "'{}' is not an email address",
                email
            )));
        }
        if account.password.is_empty() {
            return Err(RegistryError::InvalidAccount(format!(
                "password for '{}' cannot be empty",
                email
            )));
        }
        Ok(())
    }

    /// Register a new account at the end of the order.
    pub fn add(&mut self, account: Account) -> Result<(), RegistryError> {
        Self::validate(&account)?;
        let account = Account {
            email: account.email.trim().to_string(),
            password: account.password,
        };
        if self.position(&account.email).is_some() {
            return Err(RegistryError::DuplicateAccount(account.email));
        }
        self.entries.push(AccountEntry::new(account));
        Ok(())
    }

    /// Remove an account. Fails if it is running.
    pub fn remove(&mut self, email: &str) -> Result<Account, RegistryError> {
        let idx = self
            .position(email)
            .ok_or_else(|| RegistryError::NotFound(email.to_string()))?;
        if self.entries[idx].status == AccountStatus::Running {
            return Err(RegistryError::InUse(email.to_string()));
        }
        Ok(self.entries.remove(idx).account)
    }

    /// Replace every entry. All-or-nothing: on error the registry is unchanged.
    pub fn replace(&mut self, accounts: Vec<Account>) -> Result<(), RegistryError> {
        if let Some(entry) = self
            .entries
            .iter()
            .find(|e| e.status == AccountStatus::Running)
        {
            return Err(RegistryError::InUse(entry.email().to_string()));
        }
        *self = Self::from_accounts(accounts)?;
        Ok(())
    }

    /// Set an account's status. Setting the current status is a no-op.
    pub fn set_status(&mut self, email: &str, status: AccountStatus) -> Result<(), RegistryError> {
        let entry = self
            .get_mut(email)
            .ok_or_else(|| RegistryError::NotFound(email.to_string()))?;
        entry.status = status;
        Ok(())
    }

    /// Return an errored or disabled account to `Idle` and clear its
    /// failure history.
    pub fn reset(&mut self, email: &str) -> Result<(), RegistryError> {
        let entry = self
            .get_mut(email)
            .ok_or_else(|| RegistryError::NotFound(email.to_string()))?;
        if entry.status == AccountStatus::Running {
            return Err(RegistryError::InUse(email.to_string()));
        }
        entry.status = AccountStatus::Idle;
        entry.failures = 0;
        entry.retry_at = None;
        entry.last_error = None;
        entry.last_error_at = None;
        Ok(())
    }

    pub fn get(&self, email: &str) -> Option<&AccountEntry> {
        self.entries.iter().find(|e| e.email() == email)
    }

    pub fn get_mut(&mut self, email: &str) -> Option<&mut AccountEntry> {
        self.entries.iter_mut().find(|e| e.email() == email)
    }

    /// Stable, ordered view of all entries.
    pub fn list(&self) -> &[AccountEntry] {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> impl Iterator<Item = &mut AccountEntry> {
        self.entries.iter_mut()
    }

    /// Credentials in registry order.
    pub fn accounts(&self) -> Vec<Account> {
        self.entries.iter().map(|e| e.account.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count_with_status(&self, status: AccountStatus) -> usize {
        self.entries.iter().filter(|e| e.status == status).count()
    }

    /// Pick the next account to dispatch.
    ///
    /// Among eligible entries with pending work, the one dispatched longest
    /// ago wins (never-dispatched first); ties go to registry order.
    pub fn next_eligible<F>(&self, now: Instant, has_work: F) -> Option<&AccountEntry>
    where
        F: Fn(&Account) -> bool,
    {
        self.entries
            .iter()
            .filter(|e| e.is_eligible(now) && has_work(&e.account))
            .min_by_key(|e| e.dispatch_seq)
    }

    /// Earliest pending retry deadline, if any.
    pub fn next_retry_at(&self, now: Instant) -> Option<Instant> {
        self.entries
            .iter()
            .filter(|e| e.is_waiting_retry(now))
            .filter_map(|e| e.retry_at)
            .min()
    }

    fn position(&self, email: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.email() == email)
    }
}
