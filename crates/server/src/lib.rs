//! HTTP and WebSocket surface for the account job orchestrator.

pub mod api;
pub mod metrics;
pub mod state;
