//! Testing utilities and mock implementations.
//!
//! This module provides a scriptable job executor so the orchestrator can be
//! exercised end to end without touching the external service.
//!
//! # Example
//!
//! ```rust,ignore
//! use claimer_core::testing::{fixtures, MockJobExecutor};
//!
//! let executor = MockJobExecutor::new();
//! executor.fail_always("a@example.com").await;
//!
//! let accounts = fixtures::accounts(&["a", "b", "c"]);
//! ```

mod mock_executor;

pub use mock_executor::{MockJobExecutor, RecordedExecution};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::account::Account;
    use crate::orchestrator::OrchestratorConfig;

    /// Create a test account `<name>@example.com`.
    pub fn account(name: &str) -> Account {
        Account::new(format!("{}@example.com", name), format!("{}-secret", name))
    }

    /// Create test accounts for each name, in order.
    pub fn accounts(names: &[&str]) -> Vec<Account> {
        names.iter().map(|name| account(name)).collect()
    }

    /// Orchestrator configuration with short timings for tests.
    pub fn fast_config(concurrent: usize) -> OrchestratorConfig {
        OrchestratorConfig {
            concurrent,
            retry_backoff_ms: 50,
            job_timeout_secs: 5,
            ..Default::default()
        }
    }
}
