//! Error types for rate limiting operations.

/// Error kinds for rate limiting operations.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
pub enum RateLimitErrorKind {
    /// A window rejected the request.
    #[display("Rate limit exceeded for {} window, resets at {}", window, reset_at_ms)]
    Exceeded {
        /// Name of the rejecting window (minute, hour, day)
        window: String,
        /// Epoch milliseconds at which the rejecting window resets
        reset_at_ms: u64,
    },
    /// Invalid limiter configuration.
    #[display("Configuration error: {}", _0)]
    Config(String),
}

/// Rate limiting error with location tracking.
///
/// # Examples
///
/// ```
/// use tributary_error::{RateLimitError, RateLimitErrorKind};
///
/// let err = RateLimitError::new(RateLimitErrorKind::Exceeded {
///     window: "minute".into(),
///     reset_at_ms: 60_000,
/// });
/// assert_eq!(err.reset_at_ms(), Some(60_000));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Rate Limit Error: {} at line {} in {}", kind, line, file)]
pub struct RateLimitError {
    kind: RateLimitErrorKind,
    line: u32,
    file: &'static str,
}

impl RateLimitError {
    /// Create a new rate limiting error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: RateLimitErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &RateLimitErrorKind {
        &self.kind
    }

    /// Reset time of the rejecting window, if this is an `Exceeded` error.
    pub fn reset_at_ms(&self) -> Option<u64> {
        match &self.kind {
            RateLimitErrorKind::Exceeded { reset_at_ms, .. } => Some(*reset_at_ms),
            RateLimitErrorKind::Config(_) => None,
        }
    }
}
