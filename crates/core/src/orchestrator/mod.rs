//! Account orchestrator.
//!
//! Owns the worker pool and the account registry, and drives the lifecycle
//! `Stopped -> Starting -> Running -> Stopping -> Stopped`:
//! - **Scheduling**: least recently dispatched eligible account first, never
//!   more than `concurrent` accounts running
//! - **Failures**: retried after a fixed backoff, disabled once the retry
//!   budget is spent
//! - **Publication**: every committed change produces a new [`AppState`]
//!
//! [`AppState`]: crate::status::AppState

mod config;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::AccountOrchestrator;
pub use types::{ErrorClass, OrchestratorError, Phase};
