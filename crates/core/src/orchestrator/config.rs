//! Orchestrator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the account orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Initial concurrency ceiling (accounts holding a worker slot at once).
    /// Can be changed at runtime through settings.
    #[serde(default = "default_concurrent")]
    pub concurrent: usize,

    /// Consecutive failed dispatches before an account is disabled.
    #[serde(default = "default_retry_budget")]
    pub retry_budget: u32,

    /// Delay before a failed account is eligible again (milliseconds).
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,

    /// Deadline for a single job (seconds).
    /// A job that exceeds it counts as a failure and its slot is released.
    #[serde(default = "default_job_timeout")]
    pub job_timeout_secs: u64,

    /// Number of recent completions used for the time-left estimate.
    #[serde(default = "default_rate_window")]
    pub rate_window: usize,

    /// Capacity of the worker event channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_concurrent() -> usize {
    1
}

fn default_retry_budget() -> u32 {
    3
}

fn default_retry_backoff() -> u64 {
    30_000 // 30 seconds
}

fn default_job_timeout() -> u64 {
    300 // 5 minutes
}

fn default_rate_window() -> usize {
    10
}

fn default_event_buffer() -> usize {
    256
}

impl OrchestratorConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            concurrent: default_concurrent(),
            retry_budget: default_retry_budget(),
            retry_backoff_ms: default_retry_backoff(),
            job_timeout_secs: default_job_timeout(),
            rate_window: default_rate_window(),
            event_buffer: default_event_buffer(),
        }
    }
}
