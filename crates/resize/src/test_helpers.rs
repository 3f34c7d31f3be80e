//! Shared test doubles for the resize crate.

use crate::embedding::HashingEmbedder;
use async_trait::async_trait;
use contextresizer_core::embedding::Embedder;
use contextresizer_core::error::{ProviderError, RankError};
use contextresizer_core::message::Message;
use contextresizer_core::provider::{
    EmbeddingRequest, EmbeddingResponse, Provider, ProviderRequest, ProviderResponse, Usage,
};
use contextresizer_core::rank::Ranker;
use contextresizer_core::summarize::Summarizer;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// A provider that replies with a scripted sequence and records every request.
///
/// Panics if more calls are made than replies provided.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("ScriptedProvider: no more replies");

        reply.map(|text| ProviderResponse {
            message: Message::assistant(text),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: request.model,
        })
    }
}

/// A provider whose only working capability is embeddings (via hashing).
pub struct EmbeddingOnlyProvider {
    embedder: HashingEmbedder,
    calls: AtomicUsize,
}

impl EmbeddingOnlyProvider {
    pub fn new(embedder: HashingEmbedder) -> Self {
        Self {
            embedder,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for EmbeddingOnlyProvider {
    fn name(&self) -> &str {
        "embedding_only"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(ProviderError::NotConfigured("completions disabled".into()))
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(EmbeddingResponse {
            embeddings: request.inputs.iter().map(|t| self.embedder.embed_one(t)).collect(),
            model: request.model,
            usage: None,
        })
    }
}

/// An embedder that always fails.
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    fn name(&self) -> &str {
        "failing"
    }

    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        Err(ProviderError::Network("similarity backend unreachable".into()))
    }
}

/// A ranker that returns a fixed ordering, or fails when none is given.
pub struct FixedRanker {
    order: Option<Vec<usize>>,
    calls: AtomicUsize,
}

impl FixedRanker {
    pub fn new(order: Vec<usize>) -> Self {
        Self {
            order: Some(order),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            order: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Ranker for FixedRanker {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn rank(&self, _items: &[String], _query: &str) -> Result<Vec<usize>, RankError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.order
            .clone()
            .ok_or_else(|| RankError::EmbeddingFailed("ranker offline".into()))
    }
}

enum Behaviour {
    Reply(String),
    Fail,
    /// Reply with `"<budget> first-word"` so tests can see which budget a text got.
    Tag,
    /// Like `Tag`, but fail for texts starting with any of these prefixes.
    TagFailingOn(Vec<String>),
}

/// A summarizer with scripted behaviour that records what it was asked.
pub struct ScriptedSummarizer {
    behaviour: Behaviour,
    delay_per_token: Option<Duration>,
    seen: Mutex<Vec<(String, usize)>>,
}

impl ScriptedSummarizer {
    fn with_behaviour(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            delay_per_token: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::with_behaviour(Behaviour::Reply(text.into()))
    }

    pub fn failing() -> Self {
        Self::with_behaviour(Behaviour::Fail)
    }

    pub fn tagging() -> Self {
        Self::with_behaviour(Behaviour::Tag)
    }

    pub fn tagging_failing_on(prefixes: &[&str]) -> Self {
        Self::with_behaviour(Behaviour::TagFailingOn(
            prefixes.iter().map(|p| p.to_string()).collect(),
        ))
    }

    /// Sleep `budget * delay` before replying, so bigger budgets finish last.
    pub fn with_delay_per_token(mut self, delay: Duration) -> Self {
        self.delay_per_token = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn budgets(&self) -> Vec<usize> {
        self.seen.lock().unwrap().iter().map(|(_, b)| *b).collect()
    }

    pub fn texts(&self) -> Vec<String> {
        self.seen.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
    }
}

pub fn tag(text: &str, budget: usize) -> String {
    let first = text.split_whitespace().next().unwrap_or("");
    format!("<{budget}> {first}")
}

#[async_trait]
impl Summarizer for ScriptedSummarizer {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn summarize(&self, text: &str, token_budget: usize) -> Result<String, ProviderError> {
        self.seen.lock().unwrap().push((text.to_string(), token_budget));

        if let Some(delay) = self.delay_per_token {
            tokio::time::sleep(delay * token_budget as u32).await;
        }

        match &self.behaviour {
            Behaviour::Reply(reply) => Ok(reply.clone()),
            Behaviour::Fail => Err(ProviderError::ApiError {
                status_code: 429,
                message: "slow down".into(),
            }),
            Behaviour::Tag => Ok(tag(text, token_budget)),
            Behaviour::TagFailingOn(prefixes) => {
                if prefixes.iter().any(|p| text.starts_with(p.as_str())) {
                    Err(ProviderError::Timeout("summary timed out".into()))
                } else {
                    Ok(tag(text, token_budget))
                }
            }
        }
    }
}
