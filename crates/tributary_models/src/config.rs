//! Upstream provider configuration.

use crate::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tributary_rate_limit::ThrottleConfig;

/// Default OpenAI-compatible API root.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Settings for the completion provider, from the `[upstream]` section.
///
/// ```toml
/// [upstream]
/// base_url = "https://api.openai.com/v1"
/// max_attempts = 3
/// base_delay_ms = 1000
///
/// [upstream.throttle]
/// requests_per_minute = 500
/// max_concurrent = 50
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct UpstreamConfig {
    /// API root; `/chat/completions` is appended
    #[serde(default = "default_base_url")]
    base_url: String,
    /// Bearer token. Usually supplied through `OPENAI_API_KEY`.
    #[serde(default, skip_serializing)]
    api_key: Option<String>,
    /// Seconds allowed for establishing the connection
    #[serde(default = "default_connect_timeout_secs")]
    connect_timeout_secs: u64,
    /// Total attempts to open a stream, including the first
    #[serde(default = "default_max_attempts")]
    max_attempts: u32,
    /// Backoff before the second attempt, doubled for each later one
    #[serde(default = "default_base_delay_ms")]
    base_delay_ms: u64,
    /// Outbound budget shared by all requests
    #[serde(default)]
    throttle: ThrottleConfig,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            throttle: ThrottleConfig::default(),
        }
    }
}

impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("max_attempts", &self.max_attempts)
            .field("base_delay_ms", &self.base_delay_ms)
            .field("throttle", &self.throttle)
            .finish()
    }
}

impl UpstreamConfig {
    /// Override the API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Retry policy described by `max_attempts` and `base_delay_ms`.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.base_delay_ms))
    }

    /// Connection timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
