//! Application error types for the Crossfade backend.
//!
//! Provides a unified error type that implements `IntoResponse` for Axum.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::spotify_url::UrlError;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration loading/parsing errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Shared token store errors
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// The `url` parameter is not a usable Spotify URL
    #[error("{0}")]
    InvalidUrl(#[from] UrlError),

    /// Search query missing
    #[error("Search query is empty")]
    EmptyQuery,

    /// Seed track carries no ISRC
    #[error("ISRC not found")]
    IsrcNotFound,

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// External catalog rejected our credentials
    #[error("Unauthorized by {0}")]
    Unauthorized(String),

    /// Rate limited by external service
    #[error("Rate limited: retry after {0} seconds")]
    RateLimited(u32),

    /// External service unavailable (Spotify, KKBOX, Deezer, ...)
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Request deadline exceeded
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Machine-readable code returned to clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIGURATION_ERROR",
            AppError::Cache(_) | AppError::Internal(_) => "INTERNAL_ERROR",
            AppError::InvalidUrl(e) => e.code(),
            AppError::EmptyQuery => "EMPTY_QUERY",
            AppError::IsrcNotFound => "ISRC_NOT_FOUND",
            AppError::NotFound(_) => "TRACK_NOT_FOUND",
            AppError::BadRequest(_) => "INVALID_PARAM",
            AppError::Unauthorized(_)
            | AppError::RateLimited(_)
            | AppError::ServiceUnavailable(_)
            | AppError::Timeout(_) => "SOMETHING_API_ERROR",
        }
    }

    /// Whether the error came from an upstream catalog rather than the caller.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            AppError::Unauthorized(_)
                | AppError::RateLimited(_)
                | AppError::ServiceUnavailable(_)
                | AppError::Timeout(_)
        )
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    status: u16,
    message: String,
    code: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Config(e) => {
                // Log full error details but don't expose to client
                tracing::error!("Config error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Configuration error".to_string(),
                )
            }
            AppError::Cache(e) => {
                tracing::error!("Cache error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error".to_string(),
                )
            }
            // Client-caused errors are safe to expose
            AppError::InvalidUrl(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            AppError::EmptyQuery => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::IsrcNotFound => (
                StatusCode::BAD_REQUEST,
                "The track has no ISRC".to_string(),
            ),
            AppError::NotFound(resource) => (StatusCode::NOT_FOUND, resource.clone()),
            AppError::Unauthorized(_)
            | AppError::RateLimited(_)
            | AppError::ServiceUnavailable(_)
            | AppError::Timeout(_) => {
                tracing::error!(error = %self, "Upstream catalog failure");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "An upstream music API is having problems".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            status: status.as_u16(),
            message,
            code: self.code(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
