//! HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::error::Error;

/// An error rendered as `{"error": message}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// Create an error with an explicit status.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 400 with the given message.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 404 with the given message.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Map a crate error, using `fallback` as the body of a 500.
    ///
    /// Server-side failures are logged with their detail; only the fallback
    /// reaches the client.
    #[must_use]
    pub fn from_error(err: &Error, fallback: &str) -> Self {
        if err.is_client_error() {
            Self::bad_request(err.to_string())
        } else if err.is_not_found() {
            Self::not_found(err.to_string())
        } else {
            error!("{}: {}", fallback, err);
            Self::new(StatusCode::INTERNAL_SERVER_ERROR, fallback)
        }
    }

    /// Response status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Message sent to the client.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Attach a user-facing fallback message to a crate result.
pub trait ResultExt<T> {
    /// Convert the error with [`ApiError::from_error`].
    ///
    /// # Errors
    ///
    /// Returns the mapped [`ApiError`] when `self` is an error.
    fn or_api_error(self, fallback: &str) -> Result<T, ApiError>;
}

impl<T> ResultExt<T> for crate::error::Result<T> {
    fn or_api_error(self, fallback: &str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::from_error(&e, fallback))
    }
}
