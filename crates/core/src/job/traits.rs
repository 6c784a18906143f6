//! Trait definitions for job supply and execution.

use async_trait::async_trait;

use super::types::{Job, JobError};
use crate::account::Account;

/// Supplies work for accounts.
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Returns the name of this source implementation.
    fn name(&self) -> &str;

    /// Outstanding work units for the account.
    ///
    /// Called from the scheduler's critical section, so it must be cheap and
    /// must not block on I/O.
    fn pending(&self, account: &Account) -> u64;

    /// Prepares a new run for the given accounts.
    async fn prepare(&self, accounts: &[Account]) -> Result<(), JobError>;

    /// Hands out the next job for the account, or `None` when exhausted.
    ///
    /// A job that is not completed stays pending and is handed out again.
    async fn next_job(&self, account: &Account) -> Option<Job>;

    /// Acknowledges a successfully executed job.
    async fn complete(&self, account: &Account, job: &Job);
}

/// Executes a single job against the external service.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    /// Returns the name of this executor implementation.
    fn name(&self) -> &str;

    /// Runs the job to completion.
    async fn execute(&self, account: &Account, job: &Job) -> Result<(), JobError>;
}
