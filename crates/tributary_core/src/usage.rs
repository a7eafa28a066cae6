//! Usage records handed to the external usage store.

use crate::{ModelId, PricingTable, RequestKind, TokenUsage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One completed (or partially completed) request, attributed to a principal.
///
/// Append-only: produced once per request and handed to a usage sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    /// Principal the usage is attributed to
    principal_id: String,
    /// Model that served the request
    model_id: ModelId,
    /// Estimated input tokens
    input_tokens: u64,
    /// Estimated output tokens
    output_tokens: u64,
    /// Estimated cost in USD
    cost_usd: f64,
    /// When the request finished
    timestamp_utc: DateTime<Utc>,
    /// Kind of content requested
    request_kind: RequestKind,
}

impl UsageRecord {
    /// Price a request's usage and stamp it.
    pub fn new(
        principal_id: impl Into<String>,
        model_id: ModelId,
        request_kind: RequestKind,
        usage: TokenUsage,
        pricing: &PricingTable,
        timestamp_utc: DateTime<Utc>,
    ) -> Self {
        let cost_usd = usage.calculate_cost(&pricing.entry(model_id));
        Self {
            principal_id: principal_id.into(),
            model_id,
            input_tokens: *usage.prompt_tokens(),
            output_tokens: *usage.completion_tokens(),
            cost_usd,
            timestamp_utc,
            request_kind,
        }
    }
}

/// Aggregated usage for a principal over a time range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageTotals {
    /// Sum of input tokens
    pub input_tokens: u64,
    /// Sum of output tokens
    pub output_tokens: u64,
    /// Sum of cost in USD
    pub cost_usd: f64,
    /// Number of records
    pub request_count: u64,
}

impl UsageTotals {
    /// Fold one record into the totals.
    pub fn add(&mut self, record: &UsageRecord) {
        self.input_tokens += record.input_tokens;
        self.output_tokens += record.output_tokens;
        self.cost_usd += record.cost_usd;
        self.request_count += 1;
    }
}

impl<'a> FromIterator<&'a UsageRecord> for UsageTotals {
    fn from_iter<I: IntoIterator<Item = &'a UsageRecord>>(iter: I) -> Self {
        let mut totals = Self::default();
        for record in iter {
            totals.add(record);
        }
        totals
    }
}
