//! Job source handing out a fixed number of jobs per account per run.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::traits::JobSource;
use super::types::{Job, JobError};
use crate::account::Account;

/// Gives every account `jobs_per_account` jobs per run.
///
/// Accounts first seen after `prepare` get a fresh allocation, so accounts
/// added while running have work too.
#[derive(Debug)]
pub struct FixedJobSource {
    jobs_per_account: u64,
    remaining: Mutex<HashMap<String, u64>>,
}

impl FixedJobSource {
    pub fn new(jobs_per_account: u64) -> Self {
        Self {
            jobs_per_account,
            remaining: Mutex::new(HashMap::new()),
        }
    }

    pub fn jobs_per_account(&self) -> u64 {
        self.jobs_per_account
    }

    fn remaining(&self) -> MutexGuard<'_, HashMap<String, u64>> {
        self.remaining.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl JobSource for FixedJobSource {
    fn name(&self) -> &str {
        "fixed"
    }

    fn pending(&self, account: &Account) -> u64 {
        self.remaining()
            .get(&account.email)
            .copied()
            .unwrap_or(self.jobs_per_account)
    }

    async fn prepare(&self, accounts: &[Account]) -> Result<(), JobError> {
        let mut remaining = self.remaining();
        remaining.clear();
        for account in accounts {
            remaining.insert(account.email.clone(), self.jobs_per_account);
        }
        Ok(())
    }

    async fn next_job(&self, account: &Account) -> Option<Job> {
        let mut remaining = self.remaining();
        let left = *remaining
            .entry(account.email.clone())
            .or_insert(self.jobs_per_account);
        if left == 0 {
            return None;
        }
        Some(Job {
            account: account.email.clone(),
            seq: self.jobs_per_account - left + 1,
        })
    }

    async fn complete(&self, account: &Account, _job: &Job) {
        let mut remaining = self.remaining();
        let left = remaining
            .entry(account.email.clone())
            .or_insert(self.jobs_per_account);
        *left = left.saturating_sub(1);
    }
}
