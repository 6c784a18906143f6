//! Mapping from orchestrator errors to HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use claimer_core::{ErrorClass, OrchestratorError, RegistryError};
use serde::Serialize;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// An orchestrator error on its way out of a handler.
#[derive(Debug)]
pub struct ApiError(pub OrchestratorError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        if let OrchestratorError::Registry(RegistryError::NotFound(_)) = self.0 {
            return StatusCode::NOT_FOUND;
        }
        match self.0.class() {
            ErrorClass::Validation => StatusCode::BAD_REQUEST,
            ErrorClass::Resource => StatusCode::CONFLICT,
            ErrorClass::Execution => StatusCode::BAD_GATEWAY,
            ErrorClass::Fatal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimer_core::JobError;

    #[test]
    fn test_status_by_class() {
        assert_eq!(
            ApiError(OrchestratorError::InvalidConcurrency(0)).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError(OrchestratorError::AlreadyRunning).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError(OrchestratorError::Registry(RegistryError::InUse(
                "a@example.com".to_string()
            )))
            .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError(OrchestratorError::Registry(RegistryError::NotFound(
                "a@example.com".to_string()
            )))
            .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError(OrchestratorError::JobSource(JobError::Failed("x".to_string()))).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError(OrchestratorError::Fatal("broken".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
