//! Embedder trait — turns text into vectors for similarity search.

use crate::error::ProviderError;
use async_trait::async_trait;

/// Computes one embedding vector per input text, in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// A human-readable name for this backend (e.g., "hashing", "openai").
    fn name(&self) -> &str;

    /// Embed a batch of texts.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError>;
}
