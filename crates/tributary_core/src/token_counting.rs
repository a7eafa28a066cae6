//! Token usage accounting for a single completion.

use crate::{PricingEntry, estimate_tokens};
use serde::{Deserialize, Serialize};

/// Token usage statistics for a single LLM operation.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, derive_getters::Getters,
)]
pub struct TokenUsage {
    /// Tokens in the prompt/input.
    prompt_tokens: u64,
    /// Tokens in the response/output.
    completion_tokens: u64,
    /// Total tokens (prompt + completion).
    total_tokens: u64,
}

impl TokenUsage {
    /// Create a new token usage record.
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    /// Estimate usage from the texts sent and received.
    ///
    /// `input` should include the system text as well as the user message.
    pub fn estimate(input: &str, output: &str) -> Self {
        Self::new(estimate_tokens(input), estimate_tokens(output))
    }

    /// Calculate cost in USD for a model price.
    pub fn calculate_cost(&self, pricing: &PricingEntry) -> f64 {
        pricing.cost(self.prompt_tokens, self.completion_tokens)
    }
}
