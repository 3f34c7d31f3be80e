//! Rank-based token budget allocation.
//!
//! The most relevant message (rank 0) gets the whole budget, and each rank
//! after it gets half of the previous one.

/// Default floor below which a message is not worth summarizing.
pub const DEFAULT_MIN_BUDGET: usize = 5;

/// Token budget for a rank: `max_tokens / 2^rank`.
pub fn budget_for(rank: usize, max_tokens: f64) -> f64 {
    let exponent = i32::try_from(rank).unwrap_or(i32::MAX);
    max_tokens / 2f64.powi(exponent)
}

/// What to do with a message given its budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetDecision {
    /// Leave the message untouched; it never reaches the summarizer.
    Skip,
    /// Summarize to at most this many tokens.
    Summarize(usize),
}

impl BudgetDecision {
    /// Truncate `budget` to whole tokens and compare against `min_budget`.
    pub fn for_budget(budget: f64, min_budget: usize) -> Self {
        if budget.is_nan() || budget < 1.0 {
            return Self::Skip;
        }
        // `as` saturates for values beyond usize::MAX.
        let tokens = budget.trunc() as usize;
        if tokens < min_budget {
            Self::Skip
        } else {
            Self::Summarize(tokens)
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip)
    }
}
