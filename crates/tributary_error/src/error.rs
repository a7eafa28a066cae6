//! Top-level error wrapper types.

use crate::{ConfigError, HttpError, RateLimitError, StreamError, UpstreamError, ValidationError};

/// Every failure the pipeline can surface.
///
/// # Examples
///
/// ```
/// use tributary_error::{HttpError, TributaryError};
///
/// let http_err = HttpError::new("Connection failed");
/// let err: TributaryError = http_err.into();
/// assert!(format!("{}", err).contains("HTTP Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum TributaryErrorKind {
    /// HTTP error
    #[from(HttpError)]
    Http(HttpError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Bad or missing request fields
    #[from(ValidationError)]
    Validation(ValidationError),
    /// Principal exceeded a rate limit window
    #[from(RateLimitError)]
    RateLimit(RateLimitError),
    /// Model provider failure
    #[from(UpstreamError)]
    Upstream(UpstreamError),
    /// Event stream failure
    #[from(StreamError)]
    Stream(StreamError),
}

/// Tributary error with kind discrimination.
///
/// # Examples
///
/// ```
/// use tributary_error::{ConfigError, TributaryErrorKind, TributaryResult};
///
/// fn might_fail() -> TributaryResult<()> {
///     Err(ConfigError::new("Missing field"))?
/// }
///
/// let err = might_fail().unwrap_err();
/// assert!(matches!(err.kind(), TributaryErrorKind::Config(_)));
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Tributary Error: {}", _0)]
pub struct TributaryError(Box<TributaryErrorKind>);

impl TributaryError {
    /// Create a new error from a kind.
    pub fn new(kind: TributaryErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &TributaryErrorKind {
        &self.0
    }

    /// Consume the wrapper and return the kind.
    pub fn into_kind(self) -> TributaryErrorKind {
        *self.0
    }
}

// Generic From implementation for any type that converts to TributaryErrorKind
impl<T> From<T> for TributaryError
where
    T: Into<TributaryErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Tributary operations.
pub type TributaryResult<T> = std::result::Result<T, TributaryError>;
