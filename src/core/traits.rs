//! Core traits for the domain layer
//!
//! These traits define the interfaces that domain components depend on,
//! allowing infrastructure to be injected and tests to use mocks.

use async_trait::async_trait;

use super::errors::BackendError;

/// Request/response contract with the text-generation backend
///
/// The HTTP client in `transport::client` is the production implementation.
/// Implementations must be cheap to share across tasks.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate a reply for `prompt`.
    ///
    /// `model` is passed through untouched; `None` lets the backend pick its default.
    /// Returns the generated text, which may be empty.
    async fn generate(&self, prompt: &str, model: Option<&str>) -> Result<String, BackendError>;
}
