//! Fixed-window definitions and limiter decisions.

use serde::{Deserialize, Serialize};
use tributary_error::{RateLimitError, RateLimitErrorKind};

/// Length of a fixed rate-limit window.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WindowKind {
    /// 60 seconds
    Minute,
    /// 60 minutes
    Hour,
    /// 24 hours
    Day,
}

impl WindowKind {
    /// Window length in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        match self {
            WindowKind::Minute => 60_000,
            WindowKind::Hour => 3_600_000,
            WindowKind::Day => 86_400_000,
        }
    }
}

/// One configured window: at most `max_requests` per `kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Window length
    pub kind: WindowKind,
    /// Requests allowed per window
    pub max_requests: u32,
}

impl WindowConfig {
    /// Create a window configuration.
    pub fn new(kind: WindowKind, max_requests: u32) -> Self {
        Self { kind, max_requests }
    }
}

/// The set of windows every request must pass.
///
/// # Examples
///
/// ```
/// use tributary_rate_limit::{RateLimitPolicy, WindowConfig, WindowKind};
///
/// let policy = RateLimitPolicy::new(vec![
///     WindowConfig::new(WindowKind::Minute, 10),
///     WindowConfig::new(WindowKind::Day, 500),
/// ])
/// .unwrap();
/// assert_eq!(policy.windows().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<WindowConfig>", into = "Vec<WindowConfig>")]
pub struct RateLimitPolicy {
    windows: Vec<WindowConfig>,
}

impl RateLimitPolicy {
    /// Build a policy.
    ///
    /// # Errors
    ///
    /// Rejects windows with `max_requests == 0` and duplicate window kinds.
    #[track_caller]
    pub fn new(windows: Vec<WindowConfig>) -> Result<Self, RateLimitError> {
        for (index, window) in windows.iter().enumerate() {
            if window.max_requests == 0 {
                return Err(RateLimitError::new(RateLimitErrorKind::Config(format!(
                    "{} window must allow at least one request",
                    window.kind
                ))));
            }
            if windows[..index].iter().any(|w| w.kind == window.kind) {
                return Err(RateLimitError::new(RateLimitErrorKind::Config(format!(
                    "{} window configured more than once",
                    window.kind
                ))));
            }
        }
        Ok(Self { windows })
    }

    pub(crate) fn from_windows_unchecked(windows: Vec<WindowConfig>) -> Self {
        Self { windows }
    }

    /// The configured windows.
    pub fn windows(&self) -> &[WindowConfig] {
        &self.windows
    }
}

impl TryFrom<Vec<WindowConfig>> for RateLimitPolicy {
    type Error = RateLimitError;

    fn try_from(windows: Vec<WindowConfig>) -> Result<Self, Self::Error> {
        Self::new(windows)
    }
}

impl From<RateLimitPolicy> for Vec<WindowConfig> {
    fn from(policy: RateLimitPolicy) -> Self {
        policy.windows
    }
}

/// Counter state of one `(principal, window kind)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_getters::Getters)]
pub struct RateLimitWindow {
    /// Requests counted in the current window
    count: u32,
    /// Epoch milliseconds at which the window expires
    reset_at_ms: u64,
}

impl RateLimitWindow {
    /// Open a fresh window holding the current request.
    pub fn open(now_ms: u64, kind: WindowKind) -> Self {
        Self {
            count: 1,
            reset_at_ms: now_ms.saturating_add(kind.duration_ms()),
        }
    }

    /// True once `now_ms` has reached the reset time.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.reset_at_ms
    }

    pub(crate) fn increment(&mut self) {
        self.count += 1;
    }
}

/// Outcome of a check-and-consume call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RateLimitDecision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Requests left in the tightest window (0 when rejected, `u32::MAX` when no window is configured)
    pub remaining: u32,
    /// When the tightest (or rejecting) window resets, in epoch milliseconds
    pub reset_at_ms: u64,
    /// The window that rejected the request
    pub limited_by: Option<WindowKind>,
}

impl RateLimitDecision {
    /// Decision for a policy with no windows.
    pub fn unlimited() -> Self {
        Self {
            allowed: true,
            remaining: u32::MAX,
            reset_at_ms: 0,
            limited_by: None,
        }
    }

    /// Convert a rejection into an error, passing allowed decisions through.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitErrorKind::Exceeded`] when the request was rejected.
    #[track_caller]
    pub fn into_result(self) -> Result<Self, RateLimitError> {
        match self.limited_by {
            Some(window) if !self.allowed => Err(RateLimitError::new(RateLimitErrorKind::Exceeded {
                window: window.to_string(),
                reset_at_ms: self.reset_at_ms,
            })),
            _ => Ok(self),
        }
    }
}
