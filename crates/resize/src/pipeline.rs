//! The resize pipeline: rank → allocate → summarize → reconstruct.
//!
//! 1. The last message's content is the query.
//! 2. Messages are tagged with their original index and split into
//!    protected (role in `protected_roles`) and resizable.
//! 3. Resizable contents are ranked against the query.
//! 4. Each resizable message gets `max_tokens / 2^rank` tokens. Messages
//!    whose budget truncates below `min_budget` are kept verbatim; the rest
//!    go through the summarizer, concurrently.
//! 5. Results are merged back by original index, so output order and roles
//!    always match the input, whatever order the summaries complete in.

use crate::budget::{BudgetDecision, DEFAULT_MIN_BUDGET, budget_for};
use crate::ranker::RankTable;
use crate::summarizer::{SummaryOutcome, summarize_within};
use crate::token::TokenEstimator;
use contextresizer_config::{RankBy, RankFailurePolicy, ResizeConfig};
use contextresizer_core::error::Result;
use contextresizer_core::message::{Context, DEVELOPER_ROLE, Message};
use contextresizer_core::rank::Ranker;
use contextresizer_core::summarize::Summarizer;
use futures::stream::{self, BoxStream, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Tunables for a [`ResizePipeline`].
#[derive(Debug, Clone)]
pub struct ResizeOptions {
    /// Roles that are never resized.
    pub protected_roles: Vec<String>,
    /// Budgets that truncate below this keep their message verbatim.
    pub min_budget: usize,
    /// Maximum summarizer calls in flight per resize.
    pub concurrency: usize,
    pub rank_by: RankBy,
    pub on_rank_failure: RankFailurePolicy,
    pub estimator: TokenEstimator,
}

impl Default for ResizeOptions {
    fn default() -> Self {
        Self {
            protected_roles: vec![DEVELOPER_ROLE.to_string()],
            min_budget: DEFAULT_MIN_BUDGET,
            concurrency: 4,
            rank_by: RankBy::default(),
            on_rank_failure: RankFailurePolicy::default(),
            estimator: TokenEstimator::default(),
        }
    }
}

impl ResizeOptions {
    pub fn from_config(config: &ResizeConfig) -> Self {
        Self {
            protected_roles: config.protected_roles.clone(),
            min_budget: config.min_budget,
            concurrency: config.concurrency,
            rank_by: config.rank_by,
            on_rank_failure: config.on_rank_failure,
            estimator: TokenEstimator::new(config.chars_per_token),
        }
    }

    pub fn is_protected(&self, role: &str) -> bool {
        self.protected_roles.iter().any(|r| r == role)
    }
}

/// What happened during one resize.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResizeReport {
    /// Messages in the context.
    pub messages: usize,
    /// Messages with a protected role.
    pub protected: usize,
    /// Resizable messages whose budget was below the minimum.
    pub skipped: usize,
    /// Messages that already fit their budget.
    pub within_budget: usize,
    /// Messages replaced by a summary.
    pub summarized: usize,
    /// Messages kept because the summarizer failed or returned nothing.
    pub fallbacks: usize,
    /// Whether ranking failed and input order was used instead.
    pub degraded_ranking: bool,
    pub tokens_before: usize,
    pub tokens_after: usize,
}

/// A resized message sequence plus its report.
#[derive(Debug, Clone)]
pub struct Resized {
    pub messages: Vec<Message>,
    pub report: ResizeReport,
}

/// Shrinks contexts to a token budget. Holds no per-request state, so one
/// pipeline can serve concurrent callers.
pub struct ResizePipeline {
    ranker: Arc<dyn Ranker>,
    summarizer: Arc<dyn Summarizer>,
    options: ResizeOptions,
}

impl ResizePipeline {
    pub fn new(ranker: Arc<dyn Ranker>, summarizer: Arc<dyn Summarizer>) -> Self {
        Self {
            ranker,
            summarizer,
            options: ResizeOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ResizeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ResizeOptions {
        &self.options
    }

    /// Resize a newline-delimited JSON context and serialize the result the same way.
    pub async fn resize_context(&self, context: &str, max_tokens: f64) -> Result<String> {
        let parsed = Context::parse(context)?;
        let resized = self.resize(&parsed.messages, max_tokens).await?;
        Ok(Context::from(resized.messages).to_jsonl()?)
    }

    /// Resize a message sequence. Output has the same length, order and roles.
    pub async fn resize(&self, messages: &[Message], max_tokens: f64) -> Result<Resized> {
        let estimator = self.options.estimator;
        let mut report = ResizeReport {
            messages: messages.len(),
            tokens_before: total_tokens(&estimator, messages),
            ..ResizeReport::default()
        };

        let query = messages.last().map(|m| m.content.as_str()).unwrap_or("");

        // Original indices of resizable messages, in order.
        let resizable: Vec<usize> = messages
            .iter()
            .enumerate()
            .filter(|(_, m)| !self.options.is_protected(&m.role))
            .map(|(index, _)| index)
            .collect();
        report.protected = messages.len() - resizable.len();

        if resizable.is_empty() {
            report.tokens_after = report.tokens_before;
            return Ok(Resized {
                messages: messages.to_vec(),
                report,
            });
        }

        let contents: Vec<String> = resizable
            .iter()
            .map(|&index| messages[index].content.clone())
            .collect();

        let (order, degraded) = self.rank(&contents, query).await?;
        report.degraded_ranking = degraded;
        let table = RankTable::from_order(self.options.rank_by, &contents, &order);

        let mut jobs: Vec<(usize, usize)> = Vec::new();
        for (slot, &index) in resizable.iter().enumerate() {
            let rank = table.rank_of(slot, &contents[slot]);
            let budget = budget_for(rank, max_tokens);
            match BudgetDecision::for_budget(budget, self.options.min_budget) {
                BudgetDecision::Skip => {
                    debug!(index, rank, budget, "Budget below minimum, message kept verbatim");
                    report.skipped += 1;
                }
                BudgetDecision::Summarize(tokens) => {
                    debug!(index, rank, tokens, "Message scheduled for summarization");
                    jobs.push((index, tokens));
                }
            }
        }

        let summarizer = self.summarizer.as_ref();
        let mut outcomes: HashMap<usize, SummaryOutcome> = stream::iter(jobs)
            .map(|(index, tokens)| {
                let text = messages[index].content.as_str();
                async move {
                    let outcome = summarize_within(summarizer, &estimator, text, tokens).await;
                    (index, outcome)
                }
            })
            .buffer_unordered(self.options.concurrency.max(1))
            .collect()
            .await;

        let mut output = Vec::with_capacity(messages.len());
        for (index, message) in messages.iter().enumerate() {
            match outcomes.remove(&index) {
                Some(outcome) => {
                    match &outcome {
                        SummaryOutcome::WithinBudget => report.within_budget += 1,
                        SummaryOutcome::Summarized(_) => report.summarized += 1,
                        SummaryOutcome::Fallback { .. } => report.fallbacks += 1,
                    }
                    output.push(message.with_content(outcome.into_content(&message.content)));
                }
                // Protected, or skipped for a low budget.
                None => output.push(message.clone()),
            }
        }

        report.tokens_after = total_tokens(&estimator, &output);

        info!(
            messages = report.messages,
            protected = report.protected,
            skipped = report.skipped,
            summarized = report.summarized,
            fallbacks = report.fallbacks,
            tokens_before = report.tokens_before,
            tokens_after = report.tokens_after,
            max_tokens,
            "Context resized"
        );

        Ok(Resized {
            messages: output,
            report,
        })
    }

    /// Resize plain strings against an explicit query.
    ///
    /// Ranking happens up front; summaries are produced lazily, in input
    /// order, as the stream is polled. Strings whose budget is below the
    /// minimum are left out of the stream entirely.
    pub async fn resize_texts(
        &self,
        texts: Vec<String>,
        query: &str,
        max_tokens: f64,
    ) -> Result<BoxStream<'static, String>> {
        let (order, _) = if texts.is_empty() {
            (Vec::new(), false)
        } else {
            self.rank(&texts, query).await?
        };
        let table = RankTable::from_order(self.options.rank_by, &texts, &order);

        let min_budget = self.options.min_budget;
        let plans: Vec<(String, usize)> = texts
            .into_iter()
            .enumerate()
            .filter_map(|(position, text)| {
                let rank = table.rank_of(position, &text);
                match BudgetDecision::for_budget(budget_for(rank, max_tokens), min_budget) {
                    BudgetDecision::Skip => None,
                    BudgetDecision::Summarize(tokens) => Some((text, tokens)),
                }
            })
            .collect();

        let summarizer = Arc::clone(&self.summarizer);
        let estimator = self.options.estimator;

        Ok(stream::iter(plans)
            .map(move |(text, tokens)| {
                let summarizer = Arc::clone(&summarizer);
                async move {
                    summarize_within(summarizer.as_ref(), &estimator, &text, tokens)
                        .await
                        .into_content(&text)
                }
            })
            .buffered(self.options.concurrency.max(1))
            .boxed())
    }

    /// Rank `contents`, applying the configured failure policy.
    ///
    /// Returns the ordering and whether it is the degraded input-order fallback.
    async fn rank(&self, contents: &[String], query: &str) -> Result<(Vec<usize>, bool)> {
        match self.ranker.rank(contents, query).await {
            Ok(order) => Ok((order, false)),
            Err(e) => match self.options.on_rank_failure {
                RankFailurePolicy::Fail => Err(e.into()),
                RankFailurePolicy::OriginalOrder => {
                    warn!(ranker = %self.ranker.name(), error = %e, "Ranking failed, using input order");
                    Ok(((0..contents.len()).collect(), true))
                }
            },
        }
    }
}

fn total_tokens(estimator: &TokenEstimator, messages: &[Message]) -> usize {
    messages.iter().map(|m| estimator.estimate(&m.content)).sum()
}
