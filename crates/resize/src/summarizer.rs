//! Budget-aware summarization.
//!
//! [`LlmSummarizer`] asks a chat model for a summary of a target length.
//! [`summarize_within`] wraps any [`Summarizer`] with the fast path (text that
//! already fits is returned as-is) and the fallback (errors and empty replies
//! keep the original text).

use crate::token::TokenEstimator;
use async_trait::async_trait;
use contextresizer_core::error::ProviderError;
use contextresizer_core::message::Message;
use contextresizer_core::provider::{Provider, ProviderRequest};
use contextresizer_core::summarize::Summarizer;
use std::sync::Arc;
use tracing::{debug, warn};

/// Summarizes through a chat-completion provider.
pub struct LlmSummarizer {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    estimator: TokenEstimator,
}

impl LlmSummarizer {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.3,
            estimator: TokenEstimator::default(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_estimator(mut self, estimator: TokenEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    fn instruction(&self, token_budget: usize) -> String {
        format!(
            "Summarize the following text to approximately {} characters. \
             Return only the summary without any additional text.",
            self.estimator.tokens_to_chars(token_budget)
        )
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn summarize(&self, text: &str, token_budget: usize) -> Result<String, ProviderError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages: vec![
                Message::developer(self.instruction(token_budget)),
                Message::user(text),
            ],
            temperature: self.temperature,
            max_tokens: Some(u32::try_from(token_budget).unwrap_or(u32::MAX)),
        };

        let response = self.provider.complete(request).await?;

        if let Some(usage) = &response.usage {
            debug!(
                model = %response.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Summary received"
            );
        }

        Ok(response.message.content)
    }
}

/// Result of fitting one text into its budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    /// Already within budget; the service was not called.
    WithinBudget,
    /// The service produced a non-empty summary.
    Summarized(String),
    /// The service failed or returned nothing; the original text stands.
    Fallback { reason: String },
}

impl SummaryOutcome {
    /// The content to emit for a message whose original text is `original`.
    pub fn into_content(self, original: &str) -> String {
        match self {
            Self::Summarized(summary) => summary,
            Self::WithinBudget | Self::Fallback { .. } => original.to_string(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Fit `text` into `token_budget` tokens.
///
/// Never fails: summarizer errors become [`SummaryOutcome::Fallback`].
pub async fn summarize_within(
    summarizer: &dyn Summarizer,
    estimator: &TokenEstimator,
    text: &str,
    token_budget: usize,
) -> SummaryOutcome {
    let current = estimator.estimate(text);
    if current <= token_budget {
        return SummaryOutcome::WithinBudget;
    }

    match summarizer.summarize(text, token_budget).await {
        Ok(summary) if !summary.trim().is_empty() => {
            debug!(
                summarizer = %summarizer.name(),
                before = current,
                after = estimator.estimate(&summary),
                budget = token_budget,
                "Text summarized"
            );
            SummaryOutcome::Summarized(summary)
        }
        Ok(_) => {
            warn!(summarizer = %summarizer.name(), budget = token_budget, "Summarizer returned nothing, keeping original");
            SummaryOutcome::Fallback {
                reason: "empty summary".into(),
            }
        }
        Err(e) => {
            warn!(summarizer = %summarizer.name(), error = %e, "Summarizer failed, keeping original");
            SummaryOutcome::Fallback {
                reason: e.to_string(),
            }
        }
    }
}
