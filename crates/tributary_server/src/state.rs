//! Shared handler state.

use crate::{AppConfig, UsageSink};
use std::sync::Arc;
use tributary_core::{PricingTable, PromptLibrary, RequestLimits};
use tributary_error::TributaryResult;
use tributary_models::{OpenAiProvider, UpstreamClient};
use tributary_rate_limit::{ProviderThrottle, RateLimiter};
use tracing::info;

/// Everything a request handler needs. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct AppState {
    limiter: RateLimiter,
    upstream: UpstreamClient,
    prompts: Arc<PromptLibrary>,
    pricing: Arc<PricingTable>,
    limits: Arc<RequestLimits>,
    usage: Arc<dyn UsageSink>,
}

impl AppState {
    /// State with default prompts, prices and limits.
    pub fn new(limiter: RateLimiter, upstream: UpstreamClient, usage: Arc<dyn UsageSink>) -> Self {
        Self {
            limiter,
            upstream,
            prompts: Arc::new(PromptLibrary::default()),
            pricing: Arc::new(PricingTable::default()),
            limits: Arc::new(RequestLimits::default()),
            usage,
        }
    }

    /// Wire the production collaborators described by `config`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`](tributary_error::ConfigError) if the
    /// provider HTTP client cannot be built.
    pub fn from_config(config: &AppConfig, usage: Arc<dyn UsageSink>) -> TributaryResult<Self> {
        let provider = OpenAiProvider::from_config(config.upstream())?;
        let mut upstream =
            UpstreamClient::new(Arc::new(provider)).with_retry_policy(config.upstream().retry_policy());

        let throttle = *config.upstream().throttle();
        if !throttle.is_unlimited() {
            upstream = upstream.with_throttle(ProviderThrottle::new(throttle));
        }

        let store = config.rate_limit().build_store();
        let limiter = RateLimiter::new(config.rate_limit().policy().clone(), Arc::new(store));

        info!(
            base_url = %config.upstream().base_url(),
            windows = config.rate_limit().policy().windows().len(),
            "Application state ready"
        );

        Ok(Self::new(limiter, upstream, usage)
            .with_pricing(config.pricing().clone())
            .with_limits(config.limits().clone()))
    }

    /// Replace the prompt templates.
    pub fn with_prompts(mut self, prompts: PromptLibrary) -> Self {
        self.prompts = Arc::new(prompts);
        self
    }

    /// Replace the price table.
    pub fn with_pricing(mut self, pricing: PricingTable) -> Self {
        self.pricing = Arc::new(pricing);
        self
    }

    /// Replace the request limits.
    pub fn with_limits(mut self, limits: RequestLimits) -> Self {
        self.limits = Arc::new(limits);
        self
    }

    /// Per-principal rate limiter.
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Provider client.
    pub fn upstream(&self) -> &UpstreamClient {
        &self.upstream
    }

    /// Prompt templates.
    pub fn prompts(&self) -> &PromptLibrary {
        &self.prompts
    }

    /// Price table.
    pub fn pricing(&self) -> &Arc<PricingTable> {
        &self.pricing
    }

    /// Request limits.
    pub fn limits(&self) -> &RequestLimits {
        &self.limits
    }

    /// Usage sink.
    pub fn usage(&self) -> &Arc<dyn UsageSink> {
        &self.usage
    }
}
