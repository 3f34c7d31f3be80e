//! Relevance ranking of candidate texts against a query.
//!
//! [`EmbeddingRanker`] builds a throwaway [`SimilarityIndex`] per call and
//! asks it for every item, so each one gets a position in the ordering.
//! [`RankTable`] turns that ordering into the rank the budget allocator uses.

use crate::similarity::SimilarityIndex;
use async_trait::async_trait;
use contextresizer_config::RankBy;
use contextresizer_core::embedding::Embedder;
use contextresizer_core::error::RankError;
use contextresizer_core::rank::Ranker;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Ranks items by embedding similarity to the query.
pub struct EmbeddingRanker {
    embedder: Arc<dyn Embedder>,
}

impl EmbeddingRanker {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }
}

#[async_trait]
impl Ranker for EmbeddingRanker {
    fn name(&self) -> &str {
        "embedding"
    }

    async fn rank(&self, items: &[String], query: &str) -> Result<Vec<usize>, RankError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let order: Vec<usize> = {
            let (index, query_vector) =
                SimilarityIndex::build_with_query(self.embedder.as_ref(), items, query).await?;

            debug!(
                index = %index.id(),
                backend = %self.embedder.name(),
                items = items.len(),
                "Querying similarity index"
            );

            index
                .nearest(&query_vector, items.len())
                .into_iter()
                .map(|scored| scored.position)
                .collect()
        };

        validate_permutation(&order, items.len())?;
        Ok(order)
    }
}

/// Check that `order` names every position in `0..len` exactly once.
pub fn validate_permutation(order: &[usize], len: usize) -> Result<(), RankError> {
    let incomplete = RankError::IncompleteRanking {
        expected: len,
        actual: order.len(),
    };

    if order.len() != len {
        return Err(incomplete);
    }

    let mut seen = vec![false; len];
    for &position in order {
        match seen.get_mut(position) {
            Some(slot) if !*slot => *slot = true,
            _ => return Err(incomplete),
        }
    }
    Ok(())
}

/// The content-string form of ranking: `items` reordered most relevant first.
pub async fn ranked_contents(
    ranker: &dyn Ranker,
    items: &[String],
    query: &str,
) -> Result<Vec<String>, RankError> {
    let order = ranker.rank(items, query).await?;
    Ok(order
        .into_iter()
        .filter_map(|position| items.get(position).cloned())
        .collect())
}

/// Rank lookup for resizable messages.
///
/// A rank is the 0-based position in the ranker's output. Keys absent from
/// the ordering get [`RankTable::missing_rank`], the lowest priority.
#[derive(Debug, Clone)]
pub struct RankTable {
    ranks: Ranks,
}

#[derive(Debug, Clone)]
enum Ranks {
    Content(HashMap<String, usize>),
    Position(HashMap<usize, usize>),
}

impl RankTable {
    /// Build a table from a ranker ordering over `items`.
    pub fn from_order(by: RankBy, items: &[String], order: &[usize]) -> Self {
        match by {
            RankBy::Content => Self::by_content(items, order),
            RankBy::Position => Self::by_position(order),
        }
    }

    /// Key by content. Duplicate strings share the rank of whichever
    /// occurrence appears first in the ordering.
    pub fn by_content(items: &[String], order: &[usize]) -> Self {
        let mut ranks = HashMap::new();
        for (rank, &position) in order.iter().enumerate() {
            if let Some(content) = items.get(position) {
                ranks.entry(content.clone()).or_insert(rank);
            }
        }
        Self {
            ranks: Ranks::Content(ranks),
        }
    }

    /// Key by item position; every item keeps its own rank.
    pub fn by_position(order: &[usize]) -> Self {
        let mut ranks = HashMap::new();
        for (rank, &position) in order.iter().enumerate() {
            ranks.entry(position).or_insert(rank);
        }
        Self {
            ranks: Ranks::Position(ranks),
        }
    }

    /// Rank of the item at `position` with `content`.
    pub fn rank_of(&self, position: usize, content: &str) -> usize {
        let found = match &self.ranks {
            Ranks::Content(ranks) => ranks.get(content),
            Ranks::Position(ranks) => ranks.get(&position),
        };
        found.copied().unwrap_or_else(|| self.missing_rank())
    }

    /// Rank given to unknown keys: the number of distinct ranked keys.
    pub fn missing_rank(&self) -> usize {
        match &self.ranks {
            Ranks::Content(ranks) => ranks.len(),
            Ranks::Position(ranks) => ranks.len(),
        }
    }
}
