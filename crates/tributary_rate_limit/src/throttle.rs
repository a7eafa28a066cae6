//! Outbound throttle for calls to the completion provider.
//!
//! Combines two limits:
//! - a governor quota (GCRA) on requests per minute
//! - a Tokio semaphore on concurrent open streams
//!
//! Unlike [`RateLimiter`](crate::RateLimiter), which rejects callers, the
//! throttle waits until the provider budget allows another request.

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovernorRateLimiter};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, instrument};

type DirectRateLimiter = GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Provider budget. `None` means unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Requests per minute sent to the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests_per_minute: Option<u32>,
    /// Streams open against the provider at once
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent: Option<u32>,
}

impl ThrottleConfig {
    /// True when neither limit is set.
    pub fn is_unlimited(&self) -> bool {
        self.requests_per_minute.is_none() && self.max_concurrent.is_none()
    }
}

/// Shared throttle for outbound provider requests.
///
/// Cloning shares the same budget.
///
/// # Example
///
/// ```
/// use tributary_rate_limit::{ProviderThrottle, ThrottleConfig};
///
/// # #[tokio::main]
/// # async fn main() {
/// let throttle = ProviderThrottle::new(ThrottleConfig {
///     requests_per_minute: Some(60),
///     max_concurrent: Some(1),
/// });
///
/// let guard = throttle.acquire().await;
/// assert!(throttle.try_acquire().is_none());
/// drop(guard);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ProviderThrottle {
    rpm_limiter: Option<Arc<DirectRateLimiter>>,
    concurrent_semaphore: Option<Arc<Semaphore>>,
}

impl ProviderThrottle {
    /// Create a throttle from configuration. Zero values count as unlimited.
    pub fn new(config: ThrottleConfig) -> Self {
        let rpm_limiter = config
            .requests_per_minute
            .and_then(NonZeroU32::new)
            .map(|n| Arc::new(GovernorRateLimiter::direct(Quota::per_minute(n))));

        let concurrent_semaphore = config
            .max_concurrent
            .filter(|n| *n > 0)
            .map(|n| Arc::new(Semaphore::new(n as usize)));

        Self {
            rpm_limiter,
            concurrent_semaphore,
        }
    }

    /// Wait until the provider budget allows one more request.
    ///
    /// The returned guard holds the concurrency slot until dropped.
    #[instrument(skip(self))]
    pub async fn acquire(&self) -> ThrottleGuard {
        if let Some(limiter) = &self.rpm_limiter {
            limiter.until_ready().await;
        }

        // Concurrency slot last, so no slot is held while waiting on the quota.
        let permit = match &self.concurrent_semaphore {
            Some(semaphore) => Arc::clone(semaphore).acquire_owned().await.ok(),
            None => None,
        };
        debug!(holds_slot = permit.is_some(), "Provider throttle acquired");

        ThrottleGuard { _permit: permit }
    }

    /// Acquire without waiting. Returns `None` if either limit would block.
    pub fn try_acquire(&self) -> Option<ThrottleGuard> {
        let permit = match &self.concurrent_semaphore {
            Some(semaphore) => Some(Arc::clone(semaphore).try_acquire_owned().ok()?),
            None => None,
        };

        if let Some(limiter) = &self.rpm_limiter {
            limiter.check().ok()?;
        }

        Some(ThrottleGuard { _permit: permit })
    }

    /// Concurrency slots currently free, if a cap is configured.
    pub fn available_slots(&self) -> Option<usize> {
        self.concurrent_semaphore
            .as_ref()
            .map(|semaphore| semaphore.available_permits())
    }
}

/// RAII guard returned by [`ProviderThrottle`].
///
/// Releases the concurrency slot when dropped.
#[derive(Debug)]
pub struct ThrottleGuard {
    _permit: Option<OwnedSemaphorePermit>,
}
