//! Types for the account orchestrator.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::account::RegistryError;
use crate::job::JobError;

/// Errors that can occur during orchestration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestratorError {
    /// Operation requires the orchestrator to be stopped.
    #[error("orchestrator is already running")]
    AlreadyRunning,

    /// Concurrency must be at least one.
    #[error("invalid concurrency: {0} (must be at least 1)")]
    InvalidConcurrency(usize),

    /// Account registry rejected the change.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The job source could not prepare the run.
    #[error("job source error: {0}")]
    JobSource(JobError),

    /// Internal invariant violated; the run was aborted.
    #[error("fatal orchestrator error: {0}")]
    Fatal(String),
}

/// Coarse error classes exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Bad input; state unchanged.
    Validation,
    /// Resource busy; retry later or choose differently.
    Resource,
    /// The external service failed.
    Execution,
    /// Internal invariant violation.
    Fatal,
}

impl OrchestratorError {
    pub fn class(&self) -> ErrorClass {
        match self {
            OrchestratorError::InvalidConcurrency(_) => ErrorClass::Validation,
            OrchestratorError::Registry(RegistryError::InUse(_)) => ErrorClass::Resource,
            OrchestratorError::Registry(_) => ErrorClass::Validation,
            OrchestratorError::AlreadyRunning => ErrorClass::Resource,
            OrchestratorError::JobSource(_) => ErrorClass::Execution,
            OrchestratorError::Fatal(_) => ErrorClass::Fatal,
        }
    }
}

/// Position in the orchestrator lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Stopped,
    Starting,
    Running,
    /// Applying new settings without leaving `Running`.
    Reconfiguring,
    /// Cancellation signalled; waiting for workers to drain.
    Stopping,
}

impl Phase {
    /// Whether new dispatches are allowed in this phase.
    pub fn is_active(self) -> bool {
        matches!(self, Phase::Running | Phase::Reconfiguring)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Stopped => "stopped",
            Phase::Starting => "starting",
            Phase::Running => "running",
            Phase::Reconfiguring => "reconfiguring",
            Phase::Stopping => "stopping",
        };
        f.write_str(s)
    }
}
