//! Error types for the contextresizer domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all contextresizer operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Input errors ---
    #[error("Malformed context: {0}")]
    Context(#[from] ContextError),

    // --- Ranking errors ---
    #[error("Ranking failed: {0}")]
    Rank(#[from] RankError),

    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// A context payload that could not be decoded into messages.
///
/// Line numbers are 1-based and refer to the raw payload, blank lines included.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("line {line}: invalid JSON: {reason}")]
    InvalidJson { line: usize, reason: String },

    #[error("line {line}: expected a JSON object")]
    NotAnObject { line: usize },

    #[error("line {line}: missing or non-string field `{field}`")]
    MissingField { line: usize, field: &'static str },
}

#[derive(Debug, Clone, Error)]
pub enum RankError {
    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Embedding backend returned {actual} vectors for {expected} inputs")]
    EmbeddingCountMismatch { expected: usize, actual: usize },

    #[error("Embedding backend returned a {actual}-dimensional vector, expected {expected}")]
    EmbeddingDimensionMismatch { expected: usize, actual: usize },

    #[error("Similarity backend returned an incomplete ordering ({actual} of {expected} items)")]
    IncompleteRanking { expected: usize, actual: usize },
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl From<ProviderError> for RankError {
    fn from(err: ProviderError) -> Self {
        RankError::EmbeddingFailed(err.to_string())
    }
}
