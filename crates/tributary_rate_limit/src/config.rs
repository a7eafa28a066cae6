//! Configuration structures for rate limiting.
//!
//! Deserialized from the `[rate_limit]` section of `tributary.toml`:
//!
//! ```toml
//! [rate_limit]
//! sweep_interval_secs = 300
//! max_tracked_windows = 100_000
//!
//! [[rate_limit.windows]]
//! kind = "minute"
//! max_requests = 10
//! ```

use crate::{InMemoryRateLimitStore, RateLimitPolicy, WindowConfig, WindowKind};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tributary_error::{RateLimitError, RateLimitErrorKind};

/// Rate-limit settings for the streaming endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct RateLimitConfig {
    /// Windows every request must pass
    #[serde(default = "default_policy")]
    windows: RateLimitPolicy,
    /// Seconds between sweeps of expired windows
    #[serde(default = "default_sweep_interval_secs")]
    sweep_interval_secs: u64,
    /// Upper bound on windows held in memory (unbounded when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_tracked_windows: Option<usize>,
}

fn default_policy() -> RateLimitPolicy {
    RateLimitPolicy::from_windows_unchecked(vec![
        WindowConfig::new(WindowKind::Minute, 10),
        WindowConfig::new(WindowKind::Hour, 100),
        WindowConfig::new(WindowKind::Day, 500),
    ])
}

fn default_sweep_interval_secs() -> u64 {
    300
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            windows: default_policy(),
            sweep_interval_secs: default_sweep_interval_secs(),
            max_tracked_windows: None,
        }
    }
}

impl RateLimitConfig {
    /// Replace the window policy.
    pub fn with_policy(mut self, policy: RateLimitPolicy) -> Self {
        self.windows = policy;
        self
    }

    /// Bound the number of windows held in memory.
    pub fn with_max_tracked_windows(mut self, max: usize) -> Self {
        self.max_tracked_windows = Some(max);
        self
    }

    /// The window policy.
    pub fn policy(&self) -> &RateLimitPolicy {
        &self.windows
    }

    /// Check that a bounded store can hold every window of one principal.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when `max_tracked_windows` is smaller
    /// than the number of configured windows.
    #[track_caller]
    pub fn validate(&self) -> Result<(), RateLimitError> {
        match self.max_tracked_windows {
            Some(max) if max < self.windows.windows().len() => {
                Err(RateLimitError::new(RateLimitErrorKind::Config(format!(
                    "max_tracked_windows ({}) must be at least the number of windows ({})",
                    max,
                    self.windows.windows().len()
                ))))
            }
            _ => Ok(()),
        }
    }

    /// Build the in-memory store these settings describe.
    pub fn build_store(&self) -> InMemoryRateLimitStore {
        match self.max_tracked_windows {
            Some(max) => InMemoryRateLimitStore::new().with_max_tracked_windows(max),
            None => InMemoryRateLimitStore::new(),
        }
    }

    /// Interval between sweeps, never shorter than one second.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}
