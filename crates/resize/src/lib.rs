//! # contextresizer-resize
//!
//! Shrinks a conversation to a token budget. Messages are ranked by
//! relevance to the latest message, each gets a budget that halves with its
//! rank, and anything over budget is summarized. Protected roles, order and
//! roles are always preserved.

pub mod budget;
pub mod embedding;
pub mod pipeline;
pub mod ranker;
pub mod similarity;
pub mod summarizer;
pub mod token;

#[cfg(test)]
mod test_helpers;

pub use budget::{BudgetDecision, budget_for};
pub use embedding::{HashingEmbedder, ProviderEmbedder};
pub use pipeline::{ResizeOptions, ResizePipeline, ResizeReport, Resized};
pub use ranker::{EmbeddingRanker, RankTable};
pub use similarity::SimilarityIndex;
pub use summarizer::{LlmSummarizer, SummaryOutcome, summarize_within};
pub use token::TokenEstimator;

use contextresizer_config::{AppConfig, EmbeddingBackend};
use contextresizer_core::embedding::Embedder;
use contextresizer_core::provider::Provider;
use contextresizer_core::summarize::Summarizer;
use std::sync::Arc;

/// Wire a pipeline from configuration around one provider.
///
/// The provider serves summaries, and embeddings too when the embedding
/// backend is `provider`.
pub fn build_pipeline(config: &AppConfig, provider: Arc<dyn Provider>) -> ResizePipeline {
    let options = ResizeOptions::from_config(&config.resize);

    let embedder: Arc<dyn Embedder> = match config.embedding.backend {
        EmbeddingBackend::Hashing => Arc::new(HashingEmbedder::new(config.embedding.dimensions)),
        EmbeddingBackend::Provider => Arc::new(ProviderEmbedder::new(
            Arc::clone(&provider),
            config.embedding.model.clone(),
        )),
    };

    let summarizer = LlmSummarizer::new(provider, config.summarizer.model.clone())
        .with_temperature(config.summarizer.temperature)
        .with_estimator(options.estimator);

    tracing::debug!(
        embedder = %embedder.name(),
        summarizer = %summarizer.name(),
        concurrency = options.concurrency,
        "Resize pipeline built"
    );

    ResizePipeline::new(
        Arc::new(EmbeddingRanker::new(embedder)),
        Arc::new(summarizer),
    )
    .with_options(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedProvider;
    use contextresizer_core::message::Message;

    #[tokio::test]
    async fn built_pipeline_uses_config() {
        let mut config = AppConfig::default();
        config.resize.protected_roles = vec!["system".into()];
        config.summarizer.model = "tiny-model".into();

        let provider = Arc::new(ScriptedProvider::new(vec![Ok("short".into())]));
        let pipeline = build_pipeline(&config, provider.clone());
        assert_eq!(pipeline.options().protected_roles, vec!["system".to_string()]);

        let messages = vec![
            Message::new("system", "x".repeat(400)),
            Message::user("y ".repeat(300)),
        ];
        let resized = pipeline.resize(&messages, 20.0).await.unwrap();
        assert_eq!(resized.messages[0], messages[0]);
        assert_eq!(resized.messages[1].content, "short");

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "tiny-model");
        assert_eq!(requests[0].max_tokens, Some(20));
    }
}
