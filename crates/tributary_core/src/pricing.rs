//! Token estimation and per-model pricing.

use crate::ModelId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tributary_error::ConfigError;

/// Estimate the token count of a text.
///
/// Uses the four-characters-per-token rule of thumb rather than a real
/// tokenizer, so it is lossy. It is monotonic in the length of the text.
///
/// # Examples
///
/// ```
/// use tributary_core::estimate_tokens;
///
/// assert_eq!(estimate_tokens(""), 0);
/// assert_eq!(estimate_tokens("abcd"), 1);
/// assert_eq!(estimate_tokens("abcde"), 2);
/// ```
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}

/// Price of one model, in USD per thousand tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct PricingEntry {
    /// USD per 1k input tokens
    input_cost_per_1k: f64,
    /// USD per 1k output tokens
    output_cost_per_1k: f64,
}

impl PricingEntry {
    /// Create a pricing entry.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if either price is negative or not finite.
    #[track_caller]
    pub fn new(input_cost_per_1k: f64, output_cost_per_1k: f64) -> Result<Self, ConfigError> {
        let entry = Self {
            input_cost_per_1k,
            output_cost_per_1k,
        };
        entry.validate()?;
        Ok(entry)
    }

    /// Check that both prices are finite and non-negative.
    #[track_caller]
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("input_cost_per_1k", self.input_cost_per_1k),
            ("output_cost_per_1k", self.output_cost_per_1k),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::new(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Published list price for a model.
    pub fn builtin(model: ModelId) -> Self {
        let (input_cost_per_1k, output_cost_per_1k) = match model {
            ModelId::Gpt4oMini => (0.000_15, 0.000_6),
            ModelId::Gpt4o => (0.002_5, 0.01),
            ModelId::Gpt4Turbo => (0.01, 0.03),
            ModelId::Gpt35Turbo => (0.000_5, 0.001_5),
        };
        Self {
            input_cost_per_1k,
            output_cost_per_1k,
        }
    }

    /// Cost of a call with the given token counts.
    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens as f64 / 1000.0) * self.input_cost_per_1k
            + (output_tokens as f64 / 1000.0) * self.output_cost_per_1k
    }
}

/// Pricing for every [`ModelId`], with optional per-model overrides.
///
/// # Examples
///
/// ```
/// use tributary_core::{ModelId, PricingTable};
///
/// let pricing = PricingTable::default();
/// let cost = pricing.cost(ModelId::Gpt4Turbo, 1000, 1000);
/// assert!((cost - 0.04).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PricingTable {
    overrides: HashMap<ModelId, PricingEntry>,
}

impl PricingTable {
    /// Override the price of one model.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the entry has an invalid price.
    #[track_caller]
    pub fn with_override(mut self, model: ModelId, entry: PricingEntry) -> Result<Self, ConfigError> {
        entry.validate()?;
        self.overrides.insert(model, entry);
        Ok(self)
    }

    /// Validate every override (used after deserializing from configuration).
    #[track_caller]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.overrides.values().try_for_each(PricingEntry::validate)
    }

    /// Effective price for a model.
    pub fn entry(&self, model: ModelId) -> PricingEntry {
        self.overrides
            .get(&model)
            .copied()
            .unwrap_or_else(|| PricingEntry::builtin(model))
    }

    /// Cost in USD of a call.
    pub fn cost(&self, model: ModelId, input_tokens: u64, output_tokens: u64) -> f64 {
        self.entry(model).cost(input_tokens, output_tokens)
    }
}
