//! Generation provider trait.

use async_trait::async_trait;

use crate::error::Result;

/// A provider that generates answer text from an assembled prompt.
///
/// The pipeline holds at most one provider. When none is configured, or a
/// call fails, the pipeline degrades to demo mode rather than failing the
/// request.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// A short name identifying the provider, used in logs.
    fn name(&self) -> &str;

    /// Generate a completion for the given prompt.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ProviderUnavailable`](crate::RagError::ProviderUnavailable)
    /// if the backend is unreachable or rejects the request.
    async fn generate(&self, prompt: &str) -> Result<String>;
}
