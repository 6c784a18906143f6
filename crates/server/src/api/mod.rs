mod accounts;
mod error;
mod handlers;
mod middleware;
mod orchestrator;
mod routes;
mod ws;

pub use error::ApiError;
pub use routes::create_router;
pub use ws::WsMessage;
