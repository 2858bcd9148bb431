//! Error types for the server.
//!
//! Only protocol-level conditions live here — faults tied to a
//! caller-supplied *reference* (a connection id, a piece version). Data
//! problems (bad input, failing actions, worker timeouts) never become a
//! `ServerError`; they travel in the response body with `success: false`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use flowdeck_types::PlatformError;

/// Server error type.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A referenced entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A stored connection could not be decrypted or refreshed.
    #[error("Invalid app connection: {0}")]
    InvalidConnection(String),

    /// Malformed request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<PlatformError> for ServerError {
    fn from(e: PlatformError) -> Self {
        match e {
            PlatformError::EntityNotFound { .. } | PlatformError::PieceNotFound { .. } => {
                ServerError::NotFound(e.to_string())
            }
            PlatformError::InvalidConnection(msg) => ServerError::InvalidConnection(msg),
        }
    }
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, "entity_not_found"),
            ServerError::InvalidConnection(_) => (StatusCode::BAD_REQUEST, "invalid_app_connection"),
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ServerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };

        let body = ErrorResponse {
            code: code.to_string(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
