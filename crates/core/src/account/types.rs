//! Account types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Lifecycle status of an account.
///
/// The integer encoding is part of the published state and must stay stable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    /// Not holding a slot.
    #[default]
    Idle,
    /// Waiting for a free slot in the current run.
    Queued,
    /// Holding a worker slot.
    Running,
    /// Last dispatch failed; waiting for its retry backoff.
    Errored,
    /// Retry budget exhausted. Only an explicit reset brings it back.
    Disabled,
}

impl AccountStatus {
    /// Stable integer code published in `AppState::account_status`.
    pub fn code(self) -> i32 {
        match self {
            AccountStatus::Idle => 0,
            AccountStatus::Queued => 1,
            AccountStatus::Running => 2,
            AccountStatus::Errored => 3,
            AccountStatus::Disabled => 4,
        }
    }

    /// Decode a published status code.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(AccountStatus::Idle),
            1 => Some(AccountStatus::Queued),
            2 => Some(AccountStatus::Running),
            3 => Some(AccountStatus::Errored),
            4 => Some(AccountStatus::Disabled),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AccountStatus::Idle => "idle",
            AccountStatus::Queued => "queued",
            AccountStatus::Running => "running",
            AccountStatus::Errored => "errored",
            AccountStatus::Disabled => "disabled",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credentials for one account on the external service.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Identity (email-like).
    pub email: String,
    /// Credential secret.
    pub password: String,
}

impl Account {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

// Keep secrets out of logs.
impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One registry slot: the account paired with its scheduling state.
#[derive(Debug, Clone)]
pub struct AccountEntry {
    pub account: Account,
    pub status: AccountStatus,
    /// Consecutive failed dispatches since the last success or reset.
    pub failures: u32,
    /// Earliest instant an errored account may be dispatched again.
    pub retry_at: Option<Instant>,
    /// Logical dispatch time; lower values are dispatched first.
    pub dispatch_seq: u64,
    /// Jobs completed across all runs.
    pub jobs_done: u64,
    pub last_error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
}

impl AccountEntry {
    pub fn new(account: Account) -> Self {
        Self {
            account,
            status: AccountStatus::Idle,
            failures: 0,
            retry_at: None,
            dispatch_seq: 0,
            jobs_done: 0,
            last_error: None,
            last_error_at: None,
        }
    }

    pub fn email(&self) -> &str {
        &self.account.email
    }

    /// Whether the status and backoff allow a dispatch at `now`.
    ///
    /// Pending work is checked separately by the scheduler.
    pub fn is_eligible(&self, now: Instant) -> bool {
        match self.status {
            AccountStatus::Idle | AccountStatus::Queued => true,
            AccountStatus::Errored => self.retry_at.map_or(true, |at| at <= now),
            AccountStatus::Running | AccountStatus::Disabled => false,
        }
    }

    /// Errored and still inside its backoff window.
    pub fn is_waiting_retry(&self, now: Instant) -> bool {
        self.status == AccountStatus::Errored && self.retry_at.is_some_and(|at| at > now)
    }
}

/// Read-only view of an account for external consumers (no secret).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSummary {
    pub email: String,
    pub status: AccountStatus,
    pub failures: u32,
    pub jobs_done: u64,
    pub last_error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
}

impl From<&AccountEntry> for AccountSummary {
    fn from(entry: &AccountEntry) -> Self {
        Self {
            email: entry.account.email.clone(),
            status: entry.status,
            failures: entry.failures,
            jobs_done: entry.jobs_done,
            last_error: entry.last_error.clone(),
            last_error_at: entry.last_error_at,
        }
    }
}
