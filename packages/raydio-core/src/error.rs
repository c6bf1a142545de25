//! Centralized error types for the Raydio core library.
//!
//! This module provides:
//! - Structured error types using `thiserror`
//! - Mapping of errors to HTTP status codes
//! - `IntoResponse` for JSON error responses from the presentation API

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Trait for error types that provide machine-readable error codes.
pub trait ErrorCode {
    /// Returns a machine-readable error code for API responses and logs.
    fn code(&self) -> &'static str;
}

/// Application-wide error type.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum RaydioError {
    /// Requested stream ID is not part of the current catalog.
    #[error("Stream not found: {0}")]
    StreamNotFound(String),

    /// Client sent an invalid or malformed request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration is missing or has invalid values.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The session coordinator is no longer running.
    #[error("Session closed")]
    SessionClosed,
}

impl ErrorCode for RaydioError {
    fn code(&self) -> &'static str {
        match self {
            Self::StreamNotFound(_) => "stream_not_found",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Configuration(_) => "configuration_error",
            Self::SessionClosed => "session_closed",
        }
    }
}

impl RaydioError {
    /// Maps the error to an appropriate HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::StreamNotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Configuration(_) | Self::SessionClosed => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Convenient Result alias for application-wide operations.
pub type RaydioResult<T> = Result<T, RaydioError>;

/// JSON response body for error responses.
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
    status: u16,
}

impl IntoResponse for RaydioError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.code(),
            message: self.to_string(),
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}
