//! Rate limiting for Tributary.
//!
//! Two independent mechanisms live here:
//!
//! | Type | Direction | Behavior |
//! |---|---|---|
//! | [`RateLimiter`] | inbound, per principal | fixed windows, rejects when exhausted |
//! | [`ProviderThrottle`] | outbound, shared | governor quota + semaphore, waits |
//!
//! The fixed-window limiter keeps its counters in a [`RateLimitStore`]. The
//! shipped [`InMemoryRateLimitStore`] is process-local; expired windows are
//! deleted by the task started with [`RateLimiter::spawn_sweeper`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod config;
mod limiter;
mod store;
mod throttle;
mod window;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::RateLimitConfig;
pub use limiter::RateLimiter;
pub use store::{InMemoryRateLimitStore, RateLimitStore};
pub use throttle::{ProviderThrottle, ThrottleConfig, ThrottleGuard};
pub use window::{RateLimitDecision, RateLimitPolicy, RateLimitWindow, WindowConfig, WindowKind};
