//! Error handling module
//!
//! Defines error types and handling logic used in the project

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest upstream body excerpt carried in an error message
const MAX_UPSTREAM_BODY_IN_ERROR: usize = 200;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    /// HTTP client error (connect, DNS, TLS, body read)
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Upstream answered with a non-2xx status
    #[error("Upstream returned status {status}: {body}")]
    Upstream { status: u16, body: String },

    /// Upstream did not answer within the configured timeout
    #[error("Upstream request timed out")]
    Timeout,
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Error type
    #[serde(rename = "type")]
    pub error_type: String,
    /// Error message
    pub message: String,
    /// Status reported by the upstream API, when there was one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,
}

impl AppError {
    /// Build an upstream error, keeping only the head of a long body
    pub fn upstream(status: u16, body: &str) -> Self {
        AppError::Upstream {
            status,
            body: crate::utils::logging::truncate_content(body, MAX_UPSTREAM_BODY_IN_ERROR),
        }
    }

    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::HttpClient(_) | AppError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            AppError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error type string
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::HttpClient(_) => "upstream_unreachable",
            AppError::Upstream { .. } => "upstream_error",
            AppError::Timeout => "upstream_timeout",
            AppError::Config(_) => "internal_error",
        }
    }

    /// Convert to the JSON error body
    pub fn to_error_response(&self) -> ErrorResponse {
        let upstream_status = match self {
            AppError::Upstream { status, .. } => Some(*status),
            _ => None,
        };

        ErrorResponse {
            error: ErrorDetail {
                error_type: self.error_type().to_string(),
                message: self.to_string(),
                upstream_status,
            },
        }
    }
}

/// Implement IntoResponse trait to allow errors to be returned directly as HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        tracing::error!("Application error: {} - Status code: {}", self, status);

        (status, Json(self.to_error_response())).into_response()
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(AppError::upstream(401, "bad key").status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(AppError::Timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            AppError::Config(anyhow::anyhow!("test")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_upstream_body_is_truncated() {
        let long_body = "x".repeat(1000);
        match AppError::upstream(500, &long_body) {
            AppError::Upstream { body, .. } => {
                assert!(body.starts_with(&"x".repeat(MAX_UPSTREAM_BODY_IN_ERROR)));
                assert!(body.contains("chars truncated"));
            }
            other => panic!("Expected upstream error, got {:?}", other),
        }
    }

    #[test]
    fn test_error_response_body() {
        let response = AppError::upstream(404, "city not found").to_error_response();
        assert_eq!(response.error.error_type, "upstream_error");
        assert_eq!(response.error.upstream_status, Some(404));
        assert_eq!(response.error.message, "Upstream returned status 404: city not found");
    }
}
