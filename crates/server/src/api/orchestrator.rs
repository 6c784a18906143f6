//! Orchestrator API handlers.

use axum::{extract::State, http::StatusCode, Json};
use claimer_core::{AppState, Settings};
use std::sync::Arc;
use tracing::info;

use super::error::ApiError;
use crate::state::ServerState;

/// Current status snapshot.
pub async fn get_state(State(state): State<Arc<ServerState>>) -> Json<AppState> {
    Json(state.orchestrator().snapshot())
}

/// Start a run over the registered accounts.
///
/// Without a body the current concurrency is kept.
pub async fn start(
    State(state): State<Arc<ServerState>>,
    settings: Option<Json<Settings>>,
) -> Result<(StatusCode, Json<AppState>), ApiError> {
    let orchestrator = state.orchestrator();
    let concurrent = settings
        .map(|Json(s)| s.concurrent)
        .unwrap_or_else(|| orchestrator.concurrency());

    info!("Start requested with concurrency {}", concurrent);
    orchestrator.start_registered(concurrent).await?;
    Ok((StatusCode::ACCEPTED, Json(orchestrator.snapshot())))
}

/// Stop the current run and wait for workers to drain.
pub async fn stop(State(state): State<Arc<ServerState>>) -> Json<AppState> {
    info!("Stop requested");
    Json(state.orchestrator().stop().await)
}

/// Apply new settings. Takes effect immediately on a running orchestrator.
pub async fn put_settings(
    State(state): State<Arc<ServerState>>,
    Json(settings): Json<Settings>,
) -> Result<Json<AppState>, ApiError> {
    let orchestrator = state.orchestrator();
    orchestrator.apply_settings(settings)?;
    Ok(Json(orchestrator.snapshot()))
}
