//! Per-principal fixed-window rate limiter.

use crate::{Clock, RateLimitDecision, RateLimitPolicy, RateLimitStore, SystemClock};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, instrument};
use tributary_error::RateLimitError;

/// Fixed-window rate limiter keyed by principal.
///
/// The limiter owns the policy and a clock; counters live in an injected
/// [`RateLimitStore`] so tests and multi-instance deployments can supply
/// their own store.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tributary_rate_limit::{
///     InMemoryRateLimitStore, RateLimitPolicy, RateLimiter, WindowConfig, WindowKind,
/// };
///
/// let policy = RateLimitPolicy::new(vec![WindowConfig::new(WindowKind::Minute, 2)]).unwrap();
/// let limiter = RateLimiter::new(policy, Arc::new(InMemoryRateLimitStore::new()));
///
/// assert!(limiter.check_and_consume("alice").allowed);
/// assert!(limiter.check_and_consume("alice").allowed);
/// assert!(limiter.enforce("alice").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct RateLimiter {
    policy: RateLimitPolicy,
    store: Arc<dyn RateLimitStore>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a limiter using the system clock.
    pub fn new(policy: RateLimitPolicy, store: Arc<dyn RateLimitStore>) -> Self {
        Self {
            policy,
            store,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The configured policy.
    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<dyn RateLimitStore> {
        &self.store
    }

    /// Current time according to the limiter's clock, in epoch milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Count a request against every window of the policy.
    #[instrument(skip(self))]
    pub fn check_and_consume(&self, principal_id: &str) -> RateLimitDecision {
        let now_ms = self.clock.now_ms();
        let decision = self
            .store
            .check_and_consume(principal_id, self.policy.windows(), now_ms);
        debug!(
            allowed = decision.allowed,
            remaining = decision.remaining,
            reset_at_ms = decision.reset_at_ms,
            "Rate limit decision"
        );
        decision
    }

    /// Like [`check_and_consume`](Self::check_and_consume), but rejections become errors.
    ///
    /// # Errors
    ///
    /// Returns an `Exceeded` [`RateLimitError`] carrying the rejecting window's reset time.
    #[track_caller]
    pub fn enforce(&self, principal_id: &str) -> Result<RateLimitDecision, RateLimitError> {
        self.check_and_consume(principal_id).into_result()
    }

    /// Spawn a background task that deletes expired windows every `interval`.
    ///
    /// This bounds memory only; an expired window that has not been swept yet
    /// behaves exactly like an absent one. Abort the returned handle on shutdown.
    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let clock = Arc::clone(&self.clock);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = store.sweep_expired(clock.now_ms());
                debug!(
                    removed,
                    remaining = store.tracked_windows(),
                    "Swept expired rate limit windows"
                );
            }
        })
    }
}
