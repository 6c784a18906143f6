use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::{accounts, handlers, middleware::metrics_middleware, orchestrator, ws};
use crate::state::ServerState;

pub fn create_router(state: Arc<ServerState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Orchestrator
        .route("/state", get(orchestrator::get_state))
        .route("/start", post(orchestrator::start))
        .route("/stop", post(orchestrator::stop))
        .route("/settings", put(orchestrator::put_settings))
        // Accounts
        .route("/accounts", get(accounts::list_accounts))
        .route("/accounts", put(accounts::replace_accounts))
        .route("/accounts", post(accounts::add_account))
        .route("/accounts/{email}", delete(accounts::remove_account))
        .route("/accounts/{email}/reset", post(accounts::reset_account))
        // Live updates
        .route("/ws", get(ws::ws_handler));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
