//! Job types.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One unit of work for one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Identity of the owning account.
    pub account: String,
    /// Position of this job within the account's work for the run (1-based).
    pub seq: u64,
}

/// Errors raised while executing a job.
///
/// These never leave the worker pool; they become account status changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    /// The executor did not return within the configured deadline.
    #[error("job timed out after {0:?}")]
    Timeout(Duration),

    /// The executor could not be started.
    #[error("failed to launch job: {0}")]
    Launch(String),

    /// The job ran and reported failure.
    #[error("job failed: {0}")]
    Failed(String),
}

impl JobError {
    /// Short label used for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            JobError::Timeout(_) => "timeout",
            JobError::Launch(_) => "launch",
            JobError::Failed(_) => "error",
        }
    }
}
