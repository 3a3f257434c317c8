//! The HTTP layer's single error type: every handler returns `Result<_,
//! ApiError>`, and `IntoResponse` is implemented exactly once, matching this
//! codebase's one-error-enum-per-crate-boundary convention.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use kedge_core::CoreError;

/// Error surfaced by an HTTP handler, already mapped onto a status code.
#[derive(Debug)]
pub enum ApiError {
    /// No torrent registered under the requested info-hash.
    NotFound(String),
    /// Malformed request (bad hex, missing header, unrecognized magnet).
    BadRequest(String),
    /// An engine or resume-I/O operation failed.
    Internal(String),
}

impl ApiError {
    /// Bad-hex or missing-header style validation failure.
    #[must_use]
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::BadRequest(detail.into())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { info_hash } => Self::NotFound(format!("no torrent registered for {info_hash}")),
            CoreError::Engine { operation, message } => Self::Internal(format!("{operation}: {message}")),
            CoreError::ResumeIo { info_hash, source } => Self::Internal(format!("resume I/O for {info_hash}: {source}")),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message),
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
