//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Worker pool (dispatches, active slots, job outcomes and durations)
//! - Orchestrator (retries, disabled accounts, runs)

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Worker Pool
// =============================================================================

/// Accounts submitted to the worker pool.
pub static DISPATCHES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "claimer_dispatches_total",
        "Accounts submitted to the worker pool",
    )
    .unwrap()
});

/// Worker slots currently held.
pub static WORKERS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("claimer_workers_active", "Worker slots currently held").unwrap()
});

/// Jobs that completed successfully.
pub static JOBS_COMPLETED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("claimer_jobs_completed_total", "Jobs completed successfully").unwrap()
});

/// Failed jobs by reason.
pub static JOBS_FAILED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("claimer_jobs_failed_total", "Failed jobs"),
        &["reason"], // "timeout", "launch", "error"
    )
    .unwrap()
});

/// Duration of successful jobs in seconds.
pub static JOB_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new("claimer_job_duration_seconds", "Duration of successful jobs")
            .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
    )
    .unwrap()
});

// =============================================================================
// Orchestrator
// =============================================================================

/// Retries scheduled after a failed dispatch.
pub static RETRIES_SCHEDULED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "claimer_retries_scheduled_total",
        "Retries scheduled after a failed dispatch",
    )
    .unwrap()
});

/// Accounts disabled after exhausting their retry budget.
pub static ACCOUNTS_DISABLED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "claimer_accounts_disabled_total",
        "Accounts disabled after exhausting their retry budget",
    )
    .unwrap()
});

/// Runs started.
pub static RUNS_STARTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("claimer_runs_started_total", "Orchestrator runs started").unwrap()
});

/// All core metrics, for registration in the server's registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Worker pool
        Box::new(DISPATCHES.clone()),
        Box::new(WORKERS_ACTIVE.clone()),
        Box::new(JOBS_COMPLETED.clone()),
        Box::new(JOBS_FAILED.clone()),
        Box::new(JOB_DURATION.clone()),
        // Orchestrator
        Box::new(RETRIES_SCHEDULED.clone()),
        Box::new(ACCOUNTS_DISABLED.clone()),
        Box::new(RUNS_STARTED.clone()),
    ]
}
