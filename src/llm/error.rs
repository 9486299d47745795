//! Typed errors for upstream generation calls
//!
//! The server reports every variant the same way (500 "Generation failed"),
//! but the variant decides how the failure is logged.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    /// API key missing or rejected (HTTP 401/403)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Quota exhausted (HTTP 429)
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Malformed request or unknown model (HTTP 400/404)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Upstream outage (HTTP 5xx)
    #[error("Service error: {0}")]
    ServiceError(String),

    /// Any other non-success status
    #[error("Upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    /// Connection refused, timeout and similar
    #[error("Network error: {0}")]
    Network(String),

    /// Body did not decode as a generation response
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl LlmError {
    /// Classify a non-success upstream status
    pub fn from_http_status(status: reqwest::StatusCode, body: String) -> Self {
        match status.as_u16() {
            401 | 403 => LlmError::Unauthorized(body),
            429 => LlmError::RateLimited(body),
            400 | 404 => LlmError::BadRequest(body),
            500..=599 => LlmError::ServiceError(body),
            other => LlmError::Upstream {
                status: other,
                body,
            },
        }
    }

    /// Classify a transport-level reqwest failure
    pub fn from_network_error(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Network(format!("Request timeout: {}", e))
        } else if e.is_connect() {
            LlmError::Network(format!("Connection failed: {}", e))
        } else if e.is_decode() {
            LlmError::InvalidResponse(e.to_string())
        } else if let Some(status) = e.status() {
            Self::from_http_status(status, e.to_string())
        } else {
            LlmError::Other(e.into())
        }
    }

    /// Failures an operator fixes in configuration rather than by retrying
    pub fn is_configuration_problem(&self) -> bool {
        matches!(self, LlmError::Unauthorized(_) | LlmError::BadRequest(_))
    }
}
