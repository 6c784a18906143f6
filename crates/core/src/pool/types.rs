//! Types for the worker pool.

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::job::JobError;

/// Errors returned by pool operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// Every slot is occupied.
    #[error("worker pool is full ({capacity} slots)")]
    PoolFull { capacity: usize },
}

/// Terminal result of one submission. Exactly one is reported per handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// The account's job supply was exhausted.
    Completed { jobs_done: u64, elapsed: Duration },
    /// A job failed or timed out. Later jobs were not attempted.
    Failed(JobError),
    /// Cancellation was observed between jobs.
    Cancelled,
}

impl WorkerOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            WorkerOutcome::Completed { .. } => "completed",
            WorkerOutcome::Failed(_) => "failed",
            WorkerOutcome::Cancelled => "cancelled",
        }
    }
}

/// Events sent from workers to the orchestrator, in causal order per worker.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// One job finished successfully; the worker continues.
    JobCompleted {
        handle: Uuid,
        account: String,
        elapsed: Duration,
    },
    /// The worker released its slot.
    Finished {
        handle: Uuid,
        account: String,
        outcome: WorkerOutcome,
    },
}

impl WorkerEvent {
    pub fn handle(&self) -> Uuid {
        match self {
            WorkerEvent::JobCompleted { handle, .. } | WorkerEvent::Finished { handle, .. } => {
                *handle
            }
        }
    }
}
