//! Upstream text-generation providers
//!
//! The HTTP server forwards each prompt to an `LlmProvider`. Gemini is the
//! only implementation; the trait keeps the server testable with fakes.

mod error;
mod gemini;

pub use error::LlmError;
pub use gemini::GeminiProvider;

use async_trait::async_trait;

/// Trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Generate text for a single prompt with the given model.
    ///
    /// A response without any text yields an empty string rather than an error.
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, LlmError>;
}
