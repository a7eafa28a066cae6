//! Backing stores for rate-limit windows.

use crate::{RateLimitDecision, RateLimitWindow, WindowConfig, WindowKind};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::Debug;
use tracing::{debug, warn};

/// Storage for per-principal window counters.
///
/// Implementations must perform the whole check-and-consume for one request
/// as a single atomic read-modify-write so that concurrent requests for the
/// same principal never lose updates.
pub trait RateLimitStore: Send + Sync + Debug {
    /// Evaluate every window for `principal_id` and, if all pass, count the request in each.
    ///
    /// A rejected request is not counted in any window.
    fn check_and_consume(
        &self,
        principal_id: &str,
        windows: &[WindowConfig],
        now_ms: u64,
    ) -> RateLimitDecision;

    /// Delete windows whose reset time has passed. Returns how many were removed.
    fn sweep_expired(&self, now_ms: u64) -> usize;

    /// Number of windows currently held.
    fn tracked_windows(&self) -> usize;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct WindowKey {
    principal_id: String,
    kind: WindowKind,
}

impl WindowKey {
    fn new(principal_id: &str, kind: WindowKind) -> Self {
        Self {
            principal_id: principal_id.to_string(),
            kind,
        }
    }
}

/// Process-local store keyed by `(principal, window kind)`.
///
/// Not authoritative across service instances: each process counts only the
/// requests it served. Deployments with several instances need a shared store
/// behind the same trait.
///
/// # Examples
///
/// ```
/// use tributary_rate_limit::{InMemoryRateLimitStore, RateLimitStore, WindowConfig, WindowKind};
///
/// let store = InMemoryRateLimitStore::new();
/// let windows = [WindowConfig::new(WindowKind::Minute, 1)];
///
/// assert!(store.check_and_consume("alice", &windows, 0).allowed);
/// assert!(!store.check_and_consume("alice", &windows, 1).allowed);
/// assert!(store.check_and_consume("bob", &windows, 1).allowed);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryRateLimitStore {
    windows: Mutex<HashMap<WindowKey, RateLimitWindow>>,
    max_tracked_windows: Option<usize>,
}

impl InMemoryRateLimitStore {
    /// Create an unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the number of windows held at once.
    ///
    /// When a new window would exceed the bound, expired windows are swept
    /// and, if the store is still full, the window closest to expiry that
    /// belongs to another principal is evicted. A principal's own windows are
    /// never evicted to make room for each other, so `max` should be at least
    /// the number of windows in the policy; [`RateLimitConfig::validate`]
    /// enforces this for configured stores.
    ///
    /// [`RateLimitConfig::validate`]: crate::RateLimitConfig::validate
    pub fn with_max_tracked_windows(mut self, max: usize) -> Self {
        self.max_tracked_windows = Some(max);
        self
    }

    /// Current window for a principal, if one is tracked.
    pub fn window(&self, principal_id: &str, kind: WindowKind) -> Option<RateLimitWindow> {
        self.windows
            .lock()
            .get(&WindowKey::new(principal_id, kind))
            .copied()
    }

    fn make_room(
        &self,
        windows: &mut HashMap<WindowKey, RateLimitWindow>,
        principal_id: &str,
        now_ms: u64,
    ) {
        let Some(max) = self.max_tracked_windows else {
            return;
        };
        if windows.len() < max {
            return;
        }

        windows.retain(|_, window| !window.is_expired(now_ms));
        if windows.len() < max {
            return;
        }

        let victim = windows
            .iter()
            .filter(|(key, _)| key.principal_id != principal_id)
            .min_by_key(|(_, window)| *window.reset_at_ms())
            .map(|(key, _)| key.clone());

        if let Some(key) = victim {
            warn!(
                principal_id = %key.principal_id,
                window = %key.kind,
                max,
                "Rate limit store full, evicting window closest to expiry"
            );
            windows.remove(&key);
        }
    }
}

impl RateLimitStore for InMemoryRateLimitStore {
    fn check_and_consume(
        &self,
        principal_id: &str,
        configs: &[WindowConfig],
        now_ms: u64,
    ) -> RateLimitDecision {
        if configs.is_empty() {
            return RateLimitDecision::unlimited();
        }

        let mut windows = self.windows.lock();

        // Reject without counting if any live window is exhausted.
        for config in configs {
            let key = WindowKey::new(principal_id, config.kind);
            match windows.get(&key) {
                Some(window)
                    if !window.is_expired(now_ms) && *window.count() >= config.max_requests =>
                {
                    debug!(principal_id, window = %config.kind, "Request rejected by rate limit");
                    return RateLimitDecision {
                        allowed: false,
                        remaining: 0,
                        reset_at_ms: *window.reset_at_ms(),
                        limited_by: Some(config.kind),
                    };
                }
                _ => {}
            }
        }

        let mut tightest: Option<(u32, u64)> = None;
        for config in configs {
            let key = WindowKey::new(principal_id, config.kind);
            if !windows.contains_key(&key) {
                self.make_room(&mut windows, principal_id, now_ms);
            }

            let window = windows
                .entry(key)
                .and_modify(|window| {
                    if window.is_expired(now_ms) {
                        *window = RateLimitWindow::open(now_ms, config.kind);
                    } else {
                        window.increment();
                    }
                })
                .or_insert_with(|| RateLimitWindow::open(now_ms, config.kind));

            let remaining = config.max_requests.saturating_sub(*window.count());
            let reset_at_ms = *window.reset_at_ms();
            tightest = match tightest {
                Some((best, _)) if best < remaining => tightest,
                Some((best, best_reset)) if best == remaining && best_reset >= reset_at_ms => {
                    tightest
                }
                _ => Some((remaining, reset_at_ms)),
            };
        }

        let (remaining, reset_at_ms) = tightest.unwrap_or((u32::MAX, 0));
        RateLimitDecision {
            allowed: true,
            remaining,
            reset_at_ms,
            limited_by: None,
        }
    }

    fn sweep_expired(&self, now_ms: u64) -> usize {
        let mut windows = self.windows.lock();
        let before = windows.len();
        windows.retain(|_, window| !window.is_expired(now_ms));
        before - windows.len()
    }

    fn tracked_windows(&self) -> usize {
        self.windows.lock().len()
    }
}
