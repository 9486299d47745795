//! HTTP client for the generation API
//!
//! Production `GenerationBackend`: one `POST /api/generate` per prompt,
//! no retries and no request timeout.

use async_trait::async_trait;

use crate::core::{BackendError, GenerationBackend};

use super::api::{GenerateRequest, GenerateResponse};

pub struct HttpBackend {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpBackend {
    /// `base_url` is the server root, e.g. `http://localhost:3000`
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/api/generate", base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl GenerationBackend for HttpBackend {
    async fn generate(&self, prompt: &str, model: Option<&str>) -> Result<String, BackendError> {
        let body = GenerateRequest {
            prompt: Some(prompt.to_string()),
            model: model.map(str::to_string),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        let parsed: GenerateResponse =
            serde_json::from_str(&text).map_err(|e| BackendError::Malformed(e.to_string()))?;
        Ok(parsed.generated.unwrap_or_default())
    }
}
