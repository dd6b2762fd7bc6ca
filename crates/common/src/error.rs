//! Common error types and handling for Gatehouse

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Common result type
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Gatehouse application
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unexpected error: {0}")]
    Unexpected(#[from] anyhow::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but not permitted. Deliberately carries no cause:
    /// every denial must be byte-identical regardless of which rule failed.
    #[error("Forbidden")]
    Forbidden,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Feature disabled: {0}")]
    Disabled(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// The single message used for every credential/token denial, so callers
/// cannot distinguish "unknown identifier" from "wrong secret".
pub const INVALID_CREDENTIALS: &str = "invalid credentials";

impl Error {
    /// Generic authentication failure with the uniform message
    pub fn invalid_credentials() -> Self {
        Error::Unauthorized(INVALID_CREDENTIALS.to_string())
    }

    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::Disabled(_) => StatusCode::FORBIDDEN,
            Error::Unexpected(_) | Error::Serialization(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Unexpected(_) => "UNEXPECTED_ERROR",
            Error::Serialization(_) => "SERIALIZATION_ERROR",
            Error::Unauthorized(_) => "UNAUTHORIZED",
            Error::Forbidden => "FORBIDDEN",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Conflict(_) => "CONFLICT",
            Error::Disabled(_) => "FEATURE_DISABLED",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<crate::state::StateError> for Error {
    fn from(err: crate::state::StateError) -> Self {
        // A state-machine transition only fails when the service drives it
        // out of order — an internal invariant violation, not a caller fault.
        Error::Internal(err.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        // Log internal errors with full context
        if matches!(status, StatusCode::INTERNAL_SERVER_ERROR) {
            tracing::error!(error = %self, "Internal server error");
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
