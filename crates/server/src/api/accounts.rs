//! Account management handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use claimer_core::{Account, PixAiAccount};
use std::sync::Arc;

use super::error::ApiError;
use crate::state::ServerState;

fn account_views(state: &ServerState) -> Vec<PixAiAccount> {
    state
        .orchestrator()
        .accounts()
        .iter()
        .map(PixAiAccount::redacted)
        .collect()
}

/// List accounts in registry order. Passwords are redacted.
pub async fn list_accounts(State(state): State<Arc<ServerState>>) -> Json<Vec<PixAiAccount>> {
    Json(account_views(&state))
}

/// Replace the whole account list. Only allowed while stopped.
pub async fn replace_accounts(
    State(state): State<Arc<ServerState>>,
    Json(accounts): Json<Vec<PixAiAccount>>,
) -> Result<Json<Vec<PixAiAccount>>, ApiError> {
    let accounts: Vec<Account> = accounts.into_iter().map(Account::from).collect();
    state.orchestrator().set_accounts(accounts)?;
    Ok(Json(account_views(&state)))
}

pub async fn add_account(
    State(state): State<Arc<ServerState>>,
    Json(account): Json<PixAiAccount>,
) -> Result<(StatusCode, Json<Vec<PixAiAccount>>), ApiError> {
    state.orchestrator().add_account(account.into())?;
    Ok((StatusCode::CREATED, Json(account_views(&state))))
}

pub async fn remove_account(
    State(state): State<Arc<ServerState>>,
    Path(email): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.orchestrator().remove_account(&email)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Clear an account's failures and make it eligible again.
pub async fn reset_account(
    State(state): State<Arc<ServerState>>,
    Path(email): Path<String>,
) -> Result<Json<Vec<PixAiAccount>>, ApiError> {
    state.orchestrator().reset_account(&email)?;
    Ok(Json(account_views(&state)))
}
