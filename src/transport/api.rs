//! Wire types of the generation API
//!
//! Shared by the server in `http` and the client in `client`.

use serde::{Deserialize, Serialize};

/// Body of `POST /api/generate`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Required; rejected when missing or blank
    #[serde(default)]
    pub prompt: Option<String>,
    /// Falls back to the server's default model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Success body of `POST /api/generate`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// Missing is treated like empty text by the client
    #[serde(default)]
    pub generated: Option<String>,
}

/// Error body for 400 and 500 responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
