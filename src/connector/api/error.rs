use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::domain::DomainError;

/// Error returned to HTTP callers as `{"error": message}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Validation and configuration problems are reported as-is; anything
    /// else is logged and replaced by the endpoint's `generic` message.
    pub fn from_domain(error: DomainError, generic: &str) -> Self {
        match error {
            DomainError::InvalidInput(message) => Self::new(StatusCode::BAD_REQUEST, message),
            DomainError::Configuration(message) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
            }
            other => {
                error!("{}: {}", generic, other);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, generic)
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
