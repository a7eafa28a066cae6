//! Usage accounting collaborators.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::fmt::Debug;
use tributary_core::{UsageRecord, UsageTotals};
use tributary_error::TributaryResult;
use tracing::debug;

/// Destination for usage records.
///
/// Persistent storage lives outside this service; implementations adapt it.
#[async_trait]
pub trait UsageSink: Send + Sync + Debug {
    /// Append one record.
    async fn record(&self, record: UsageRecord) -> TributaryResult<()>;

    /// Totals for `principal_id` with `from <= timestamp < to`.
    async fn totals(
        &self,
        principal_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> TributaryResult<UsageTotals>;
}

/// Process-local sink for development and tests.
#[derive(Debug, Default)]
pub struct InMemoryUsageSink {
    records: RwLock<Vec<UsageRecord>>,
}

impl InMemoryUsageSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record so far, oldest first.
    pub fn records(&self) -> Vec<UsageRecord> {
        self.records.read().clone()
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl UsageSink for InMemoryUsageSink {
    async fn record(&self, record: UsageRecord) -> TributaryResult<()> {
        debug!(
            principal_id = %record.principal_id(),
            input_tokens = record.input_tokens(),
            output_tokens = record.output_tokens(),
            "Recording usage"
        );
        self.records.write().push(record);
        Ok(())
    }

    async fn totals(
        &self,
        principal_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> TributaryResult<UsageTotals> {
        Ok(self
            .records
            .read()
            .iter()
            .filter(|record| record.principal_id() == principal_id)
            .filter(|record| *record.timestamp_utc() >= from && *record.timestamp_utc() < to)
            .collect())
    }
}
