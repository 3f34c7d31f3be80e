//! Summarizer trait — the abstraction over text compression services.

use crate::error::ProviderError;
use async_trait::async_trait;

/// Compresses text to roughly `token_budget` tokens.
///
/// An `Ok` with an empty string means the service produced nothing; callers
/// treat that the same as an error and keep the original text.
#[async_trait]
pub trait Summarizer: Send + Sync {
    fn name(&self) -> &str;

    async fn summarize(&self, text: &str, token_budget: usize) -> Result<String, ProviderError>;
}
