//! # contextresizer core
//!
//! Domain types, traits, and error definitions for contextresizer.
//! This crate has **no framework dependencies** — it defines the domain model
//! that the other crates implement against.
//!
//! ## Design Philosophy
//!
//! Each external capability (LLM completion, embeddings, relevance ranking,
//! summarization) is a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping backends via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod message;
pub mod provider;
pub mod embedding;
pub mod rank;
pub mod summarize;

// Re-export key types at crate root for ergonomics
pub use error::{ContextError, Error, ProviderError, RankError, Result};
pub use message::{Context, Message, DEVELOPER_ROLE};
pub use provider::{Provider, ProviderRequest, ProviderResponse};
pub use embedding::Embedder;
pub use rank::Ranker;
pub use summarize::Summarizer;
