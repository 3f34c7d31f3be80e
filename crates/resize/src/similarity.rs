//! Vector similarity and the per-request similarity index.
//!
//! The index lives only as long as the call that built it. It is never
//! cached or shared, and dropping it is the teardown.

use contextresizer_core::embedding::Embedder;
use contextresizer_core::error::RankError;
use tracing::trace;
use uuid::Uuid;

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if either vector is zero-length or empty.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// A document position with its similarity to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredPosition {
    pub position: usize,
    pub score: f32,
}

/// An in-memory nearest-neighbour index over one batch of documents.
///
/// Documents are keyed by their position in the batch, so duplicate texts
/// are separate entries.
pub struct SimilarityIndex {
    id: Uuid,
    embeddings: Vec<Vec<f32>>,
}

impl SimilarityIndex {
    /// Index pre-computed embeddings; entry `i` is document position `i`.
    pub fn from_embeddings(embeddings: Vec<Vec<f32>>) -> Self {
        let id = Uuid::new_v4();
        trace!(index = %id, documents = embeddings.len(), "Similarity index built");
        Self { id, embeddings }
    }

    /// Embed `documents` and `query` in one batch and return the index with
    /// the query vector.
    pub async fn build_with_query(
        embedder: &dyn Embedder,
        documents: &[String],
        query: &str,
    ) -> Result<(Self, Vec<f32>), RankError> {
        let mut batch = Vec::with_capacity(documents.len() + 1);
        batch.extend_from_slice(documents);
        batch.push(query.to_string());

        let mut vectors = embedder.embed(&batch).await?;
        if vectors.len() != batch.len() {
            return Err(RankError::EmbeddingCountMismatch {
                expected: batch.len(),
                actual: vectors.len(),
            });
        }

        // Length checked above, so the batch is non-empty.
        let query_vector = vectors.pop().unwrap_or_default();
        if let Some(ragged) = vectors.iter().find(|v| v.len() != query_vector.len()) {
            return Err(RankError::EmbeddingDimensionMismatch {
                expected: query_vector.len(),
                actual: ragged.len(),
            });
        }
        Ok((Self::from_embeddings(vectors), query_vector))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }

    /// The `n` nearest documents to `query`, most similar first.
    ///
    /// Ties keep ascending position order.
    pub fn nearest(&self, query: &[f32], n: usize) -> Vec<ScoredPosition> {
        let mut scored: Vec<ScoredPosition> = self
            .embeddings
            .iter()
            .enumerate()
            .map(|(position, emb)| ScoredPosition {
                position,
                score: cosine_similarity(emb, query),
            })
            .collect();

        // Stable sort keeps ascending position among equal scores.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(n);
        scored
    }
}

impl Drop for SimilarityIndex {
    fn drop(&mut self) {
        trace!(index = %self.id, "Similarity index discarded");
    }
}
