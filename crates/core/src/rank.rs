//! Ranker trait — orders candidate texts by relevance to a query.

use crate::error::RankError;
use async_trait::async_trait;

/// Orders `items` from most to least relevant to `query`.
///
/// Implementations return positions into `items`: every position exactly
/// once, most relevant first. Duplicate strings are distinct entries.
#[async_trait]
pub trait Ranker: Send + Sync {
    fn name(&self) -> &str;

    async fn rank(&self, items: &[String], query: &str) -> Result<Vec<usize>, RankError>;
}
