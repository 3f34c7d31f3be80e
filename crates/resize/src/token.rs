//! Token estimation utilities.
//!
//! Uses a character-based heuristic (default ~4 characters per token). It is
//! not any particular tokenizer; it only has to be a stable, monotonic proxy
//! for content length.

/// Converts between character counts and approximate token counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenEstimator {
    chars_per_token: usize,
}

impl TokenEstimator {
    pub const DEFAULT_CHARS_PER_TOKEN: usize = 4;

    /// Create an estimator with a custom ratio. A ratio of 0 is clamped to 1.
    pub fn new(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }

    pub fn chars_per_token(&self) -> usize {
        self.chars_per_token
    }

    /// Characters → tokens. Rounds up, so any non-empty text costs at least one token.
    pub fn chars_to_tokens(&self, chars: usize) -> usize {
        chars.div_ceil(self.chars_per_token)
    }

    /// Tokens → characters.
    pub fn tokens_to_chars(&self, tokens: usize) -> usize {
        tokens.saturating_mul(self.chars_per_token)
    }

    /// Estimate the token count for a string (counts chars, not bytes).
    pub fn estimate(&self, text: &str) -> usize {
        self.chars_to_tokens(text.chars().count())
    }
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CHARS_PER_TOKEN)
    }
}
