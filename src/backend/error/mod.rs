/**
 * Backend Error Types
 *
 * This module defines error types specific to the relay server. These
 * errors are used in HTTP handlers and can be converted to HTTP responses.
 *
 * # Error Categories
 *
 * - Authentication failures: refused at the handshake (real-time) or 401
 *   (REST)
 * - Validation failures: explicit 400 on the REST path; the relay turns
 *   them into `nack` replies instead
 * - Persistence failures: 500 on the REST path, `nack` on the relay path
 */
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::shared::SharedError;

/// Backend-specific error types
///
/// Each variant carries the context needed to render an HTTP response; the
/// relay path uses [`BackendError`] internally and maps it onto `nack`
/// payloads rather than responses.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Authentication failure (missing, malformed, or invalid credential)
    #[error("Authentication error: {message}")]
    AuthError {
        /// Human-readable error message
        message: String,
    },

    /// Shared error (validation or serialization from the shared module)
    #[error(transparent)]
    SharedError(#[from] SharedError),

    /// Persistence failure from the message store
    #[error("Persistence error: {0}")]
    PersistenceError(#[from] sqlx::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl BackendError {
    /// Create a new authentication error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::AuthError {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    ///
    /// # Status Code Mapping
    ///
    /// - `AuthError` - 401 Unauthorized
    /// - `SharedError::ValidationError` - 400 Bad Request
    /// - `SharedError::SerializationError` - 500 Internal Server Error
    /// - `PersistenceError` - 500 Internal Server Error
    /// - `SerializationError` - 500 Internal Server Error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::AuthError { .. } => StatusCode::UNAUTHORIZED,
            Self::SharedError(err) => match err {
                SharedError::ValidationError { .. } => StatusCode::BAD_REQUEST,
                SharedError::SerializationError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::PersistenceError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::SerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BackendError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
