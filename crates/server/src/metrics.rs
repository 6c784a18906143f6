//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the claimer server:
//! - HTTP request metrics (latency, counts)
//! - WebSocket connection metrics
//! - Orchestrator status (collected dynamically)
//! - Core worker pool and orchestrator counters

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Opts, Registry, TextEncoder,
};

use claimer_core::{AccountStatus, AppState};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "claimer_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("claimer_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "claimer_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// WebSocket Metrics
// =============================================================================

/// Active WebSocket connections.
pub static WS_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "claimer_ws_connections_active",
        "Number of active WebSocket connections",
    )
    .unwrap()
});

/// Total WebSocket connections (cumulative).
pub static WS_CONNECTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "claimer_ws_connections_total",
        "Total WebSocket connections since startup",
    )
    .unwrap()
});

/// WebSocket messages sent by type.
pub static WS_MESSAGES_SENT: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("claimer_ws_messages_sent_total", "WebSocket messages sent"),
        &["type"],
    )
    .unwrap()
});

// =============================================================================
// Orchestrator Metrics (collected dynamically)
// =============================================================================

/// Orchestrator running state (1 = running, 0 = stopped).
pub static ORCHESTRATOR_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "claimer_orchestrator_running",
        "Whether the orchestrator is running (1) or stopped (0)",
    )
    .unwrap()
});

/// Jobs left across enabled accounts.
pub static JOBS_LEFT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("claimer_jobs_left", "Jobs left across enabled accounts").unwrap()
});

/// Accounts by current status.
pub static ACCOUNTS_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("claimer_accounts_by_status", "Current account count by status"),
        &["status"],
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // WebSocket
    registry
        .register(Box::new(WS_CONNECTIONS_ACTIVE.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_CONNECTIONS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_MESSAGES_SENT.clone()))
        .unwrap();

    // Orchestrator
    registry
        .register(Box::new(ORCHESTRATOR_RUNNING.clone()))
        .unwrap();
    registry.register(Box::new(JOBS_LEFT.clone())).unwrap();
    registry
        .register(Box::new(ACCOUNTS_BY_STATUS.clone()))
        .unwrap();

    // Core metrics (worker pool, orchestrator)
    for metric in claimer_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Update gauges from the current orchestrator snapshot.
///
/// Called before encoding so scrapes see current values.
pub fn collect_dynamic_metrics(state: &AppState) {
    ORCHESTRATOR_RUNNING.set(if state.running { 1 } else { 0 });
    JOBS_LEFT.set(state.jobs_left as i64);

    for status in [
        AccountStatus::Idle,
        AccountStatus::Queued,
        AccountStatus::Running,
        AccountStatus::Errored,
        AccountStatus::Disabled,
    ] {
        let count = state
            .account_status
            .iter()
            .filter(|code| **code == status.code())
            .count();
        ACCOUNTS_BY_STATUS
            .with_label_values(&[status.as_str()])
            .set(count as i64);
    }
}

static EMAIL_SEGMENT: Lazy<regex_lite::Regex> =
    Lazy::new(|| regex_lite::Regex::new(r"/[^/]+(?:@|%40)[^/]+(/|$)").unwrap());

/// Normalize a path for metric labels (replace account emails with a placeholder).
pub fn normalize_path(path: &str) -> String {
    EMAIL_SEGMENT.replace_all(path, "/{email}$1").to_string()
}
