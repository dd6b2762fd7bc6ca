//! Authentication errors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Authentication error
#[derive(Debug)]
pub enum AuthError {
    MissingAuthorization,
    InvalidAuthorizationFormat,
    InvalidToken,
    InvalidUserId,
    SigningFailed,
    InvalidKeyMaterial,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AuthError::MissingAuthorization => (
                StatusCode::UNAUTHORIZED,
                "MISSING_AUTHORIZATION",
                "Authorization header required",
            ),
            AuthError::InvalidAuthorizationFormat => (
                StatusCode::UNAUTHORIZED,
                "INVALID_AUTHORIZATION",
                "Invalid authorization header format",
            ),
            AuthError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "INVALID_TOKEN",
                "Invalid or expired token",
            ),
            AuthError::InvalidUserId => (
                StatusCode::UNAUTHORIZED,
                "INVALID_TOKEN",
                "Invalid user ID in token",
            ),
            AuthError::SigningFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "SIGNING_ERROR",
                "Failed to sign token",
            ),
            AuthError::InvalidKeyMaterial => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "KEY_MATERIAL_ERROR",
                "Invalid signing key material",
            ),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<AuthError> for gatehouse_common::Error {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::SigningFailed | AuthError::InvalidKeyMaterial => {
                gatehouse_common::Error::Internal("token signing failed".to_string())
            }
            // Every caller-facing auth failure collapses to the uniform
            // credentials message.
            _ => gatehouse_common::Error::invalid_credentials(),
        }
    }
}
