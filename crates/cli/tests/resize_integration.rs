//! End-to-end tests for context resizing.
//!
//! These run the full pipeline (JSONL parsing, hashing-embedder ranking,
//! budget allocation, concurrent summarization and reconstruction) with a
//! scripted summarizer in place of the network.

use std::sync::{Arc, Mutex};

use contextresizer_core::error::{Error, ProviderError};
use contextresizer_core::message::{Context, Message};
use contextresizer_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use contextresizer_core::summarize::Summarizer;
use contextresizer_resize::{
    EmbeddingRanker, HashingEmbedder, LlmSummarizer, ResizeOptions, ResizePipeline,
};

// ── Mock services ────────────────────────────────────────────────────────

/// Replies `"<budget>"` and records every budget it was given.
struct RecordingSummarizer {
    seen: Mutex<Vec<(String, usize)>>,
    fail: bool,
}

impl RecordingSummarizer {
    fn new() -> Self {
        Self {
            seen: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            seen: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    fn budget_for_text(&self, text: &str) -> Option<usize> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .find(|(t, _)| t == text)
            .map(|(_, b)| *b)
    }

    fn budgets(&self) -> Vec<usize> {
        let mut budgets: Vec<usize> = self.seen.lock().unwrap().iter().map(|(_, b)| *b).collect();
        budgets.sort_unstable_by(|a, b| b.cmp(a));
        budgets
    }

    fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Summarizer for RecordingSummarizer {
    fn name(&self) -> &str {
        "recording"
    }

    async fn summarize(&self, text: &str, token_budget: usize) -> Result<String, ProviderError> {
        self.seen.lock().unwrap().push((text.to_string(), token_budget));
        if self.fail {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 30,
            });
        }
        Ok(format!("<{token_budget}>"))
    }
}

/// A chat provider that answers every completion with the same text.
struct CannedProvider {
    reply: String,
    requests: Mutex<Vec<ProviderRequest>>,
}

#[async_trait::async_trait]
impl Provider for CannedProvider {
    fn name(&self) -> &str {
        "canned"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(ProviderResponse {
            message: Message::assistant(self.reply.clone()),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: request.model,
        })
    }
}

fn hashing_pipeline(summarizer: Arc<dyn Summarizer>) -> ResizePipeline {
    let ranker = Arc::new(EmbeddingRanker::new(Arc::new(HashingEmbedder::default())));
    ResizePipeline::new(ranker, summarizer)
}

fn jsonl(messages: &[Message]) -> String {
    Context::from(messages.to_vec()).to_jsonl().unwrap()
}

fn long_text(topic: &str) -> String {
    format!("{topic} {}", format!("{topic} details and notes ").repeat(20))
}

// ── Scenarios ────────────────────────────────────────────────────────────

#[tokio::test]
async fn short_context_is_unchanged() {
    let summarizer = Arc::new(RecordingSummarizer::new());
    let pipeline = hashing_pipeline(summarizer.clone());

    let input = "{\"role\":\"developer\",\"content\":\"system rules\"}\n{\"role\":\"user\",\"content\":\"hello\"}";
    let output = pipeline.resize_context(input, 1000.0).await.unwrap();

    assert_eq!(output, input);
    assert_eq!(summarizer.calls(), 0);
}

#[tokio::test]
async fn budgets_decay_with_relevance() {
    let summarizer = Arc::new(RecordingSummarizer::new());
    let pipeline = hashing_pipeline(summarizer.clone());

    let messages = vec![
        Message::developer(long_text("instructions")),
        Message::user(long_text("weather")),
        Message::assistant(long_text("recipes")),
        Message::user(long_text("football")),
        Message::assistant(long_text("astronomy")),
        Message::user(long_text("gardening")),
    ];

    let output = pipeline.resize_context(&jsonl(&messages), 50.0).await.unwrap();
    let resized = Context::parse(&output).unwrap().into_messages();

    assert_eq!(resized.len(), messages.len());
    assert_eq!(resized[0], messages[0]);

    // The query is the last message, so it is the most relevant.
    assert_eq!(summarizer.budget_for_text(&messages[5].content), Some(50));
    assert_eq!(resized[5].content, "<50>");

    // The fifth rank (3.125 tokens) is kept verbatim without a call.
    assert_eq!(summarizer.budgets(), vec![50, 25, 12, 6]);
    let verbatim: Vec<&Message> = resized[1..]
        .iter()
        .zip(&messages[1..])
        .filter(|(out, original)| out == original)
        .map(|(out, _)| out)
        .collect();
    assert_eq!(verbatim.len(), 1);

    for (out, original) in resized.iter().zip(&messages) {
        assert_eq!(out.role, original.role);
    }
}

#[tokio::test]
async fn empty_context_yields_empty_output() {
    let summarizer = Arc::new(RecordingSummarizer::new());
    let pipeline = hashing_pipeline(summarizer.clone());

    assert_eq!(pipeline.resize_context("", 1000.0).await.unwrap(), "");
    assert_eq!(summarizer.calls(), 0);
}

#[tokio::test]
async fn zero_budget_passes_everything_through() {
    let summarizer = Arc::new(RecordingSummarizer::new());
    let pipeline = hashing_pipeline(summarizer.clone());

    let messages = vec![
        Message::developer(long_text("rules")),
        Message::user(long_text("question")),
        Message::assistant(long_text("answer")),
    ];
    let input = jsonl(&messages);

    assert_eq!(pipeline.resize_context(&input, 0.0).await.unwrap(), input);
    assert_eq!(summarizer.calls(), 0);
}

// ── Invariants ───────────────────────────────────────────────────────────

#[tokio::test]
async fn resizing_within_budget_is_idempotent() {
    let summarizer = Arc::new(RecordingSummarizer::new());
    let pipeline = hashing_pipeline(summarizer.clone());

    let input = jsonl(&[
        Message::user("what time is it"),
        Message::assistant("noon"),
        Message::user("thanks"),
    ]);
    let once = pipeline.resize_context(&input, 500.0).await.unwrap();
    let twice = pipeline.resize_context(&once, 500.0).await.unwrap();

    assert_eq!(once, input);
    assert_eq!(twice, input);
}

#[tokio::test]
async fn protected_roles_are_never_sent_for_summary() {
    let summarizer = Arc::new(RecordingSummarizer::new());
    let pipeline = hashing_pipeline(summarizer.clone());

    let rules = long_text("rules");
    let messages = vec![
        Message::developer(rules.clone()),
        Message::user(long_text("question")),
        Message::developer(long_text("more rules")),
        Message::user(long_text("follow up")),
    ];
    let resized = pipeline.resize(&messages, 40.0).await.unwrap();

    assert_eq!(resized.messages[0], messages[0]);
    assert_eq!(resized.messages[2], messages[2]);
    assert_eq!(resized.report.protected, 2);
    assert!(summarizer.budget_for_text(&rules).is_none());
}

#[tokio::test]
async fn summarizer_outage_keeps_every_message() {
    let summarizer = Arc::new(RecordingSummarizer::failing());
    let pipeline = hashing_pipeline(summarizer.clone());

    let messages = vec![
        Message::user(long_text("alpha")),
        Message::assistant(long_text("beta")),
        Message::user(long_text("gamma")),
    ];
    let resized = pipeline.resize(&messages, 100.0).await.unwrap();

    assert_eq!(resized.messages, messages);
    assert_eq!(resized.report.fallbacks, 3);
    assert_eq!(summarizer.calls(), 3);
}

#[tokio::test]
async fn skipped_middle_message_keeps_neighbours_aligned() {
    let summarizer = Arc::new(RecordingSummarizer::new());
    let pipeline = hashing_pipeline(summarizer.clone());

    let messages = vec![
        Message::user(long_text("databases")),
        Message::assistant(long_text("unrelated poetry")),
        Message::user(long_text("databases")),
    ];
    // Query and the first message share content and rank 0 (24 tokens);
    // the poem is third in the ordering, rank 2, with 6.
    let resized = pipeline.resize(&messages, 24.0).await.unwrap();

    assert_eq!(resized.messages[0].content, "<24>");
    assert_eq!(resized.messages[1].content, "<6>");
    assert_eq!(resized.messages[2].content, "<24>");

    // At 18 tokens the poem falls to 4 and is skipped; neighbours keep theirs.
    let resized = pipeline.resize(&messages, 18.0).await.unwrap();
    assert_eq!(resized.messages[0].content, "<18>");
    assert_eq!(resized.messages[1], messages[1]);
    assert_eq!(resized.messages[2].content, "<18>");
}

#[tokio::test]
async fn extra_fields_survive_round_trip() {
    let summarizer = Arc::new(RecordingSummarizer::new());
    let pipeline = hashing_pipeline(summarizer);

    let input = r#"{"role":"tool","content":"ok","tool_call_id":"call_7"}"#;
    let output = pipeline.resize_context(input, 100.0).await.unwrap();
    assert_eq!(output, input);
}

#[tokio::test]
async fn malformed_context_is_rejected() {
    let pipeline = hashing_pipeline(Arc::new(RecordingSummarizer::new()));

    let err = pipeline
        .resize_context("{\"role\":\"user\",\"content\":\"hi\"}\nnot json", 100.0)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Context(_)));
    assert!(err.to_string().contains("line 2"));
}

#[tokio::test]
async fn llm_summarizer_end_to_end() {
    let provider = Arc::new(CannedProvider {
        reply: "condensed".into(),
        requests: Mutex::new(Vec::new()),
    });
    let summarizer = Arc::new(LlmSummarizer::new(provider.clone(), "gpt-4.1-nano"));
    let pipeline = hashing_pipeline(summarizer).with_options(ResizeOptions {
        concurrency: 1,
        ..ResizeOptions::default()
    });

    let messages = vec![
        Message::developer("be brief"),
        Message::user(long_text("history")),
    ];
    let resized = pipeline.resize(&messages, 30.0).await.unwrap();

    assert_eq!(resized.messages[0].content, "be brief");
    assert_eq!(resized.messages[1].content, "condensed");

    let requests = provider.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].max_tokens, Some(30));
    assert!(requests[0].messages[0].content.contains("120 characters"));
}
