//! Upstream model provider errors and retry classification.

/// Failure talking to the upstream model provider.
///
/// Carries the last underlying message, the HTTP status if one was received,
/// and whether a fresh user-initiated retry is likely to succeed.
///
/// # Examples
///
/// ```
/// use tributary_error::{RetryableError, UpstreamError};
///
/// let err = UpstreamError::from_status(503, "Service unavailable");
/// assert!(err.is_retryable());
///
/// let err = UpstreamError::from_status(401, "Invalid API key");
/// assert!(!err.is_retryable());
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Upstream Error: {} (status {:?}, retryable {}) at line {} in {}", message, status, retryable, line, file)]
pub struct UpstreamError {
    /// The underlying error message
    pub message: String,
    /// HTTP status code, if the provider answered
    pub status: Option<u16>,
    /// Whether retrying the same call may succeed
    pub retryable: bool,
    /// Line number where the error was created
    pub line: u32,
    /// File where the error was created
    pub file: &'static str,
}

impl UpstreamError {
    /// Error for a provider response with an explicit HTTP status.
    #[track_caller]
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self::build(Some(status), message.into())
    }

    /// Error with no HTTP status (connection reset, DNS, timeout, broken stream).
    #[track_caller]
    pub fn network(message: impl Into<String>) -> Self {
        Self::build(None, message.into())
    }

    #[track_caller]
    fn build(status: Option<u16>, message: String) -> Self {
        let location = std::panic::Location::caller();
        Self {
            message,
            status,
            retryable: is_retryable_status(status),
            line: location.line(),
            file: location.file(),
        }
    }
}

/// Classify a provider failure by HTTP status.
///
/// 429, any 5xx, and failures without a status are retryable. Every other
/// status is terminal.
pub fn is_retryable_status(status: Option<u16>) -> bool {
    match status {
        None => true,
        Some(429) => true,
        Some(code) => (500..=599).contains(&code),
    }
}

/// Trait for errors that support retry logic.
///
/// This trait allows error types to specify whether they should trigger a retry.
pub trait RetryableError {
    /// Returns true if this error should trigger a retry.
    ///
    /// Transient errors like 503 (service unavailable), 429 (rate limit),
    /// or network failures should return true. Permanent errors like 401
    /// (unauthorized) or 400 (bad request) should return false.
    fn is_retryable(&self) -> bool;
}

impl RetryableError for UpstreamError {
    fn is_retryable(&self) -> bool {
        self.retryable
    }
}

/// Message that is safe to show to an end user.
///
/// Provider error bodies may echo request details or credentials, so errors
/// that cross the wire to a browser are rendered through this trait instead
/// of `Display`.
pub trait PublicMessage {
    /// User-facing description of the failure.
    fn public_message(&self) -> String;
}

impl PublicMessage for UpstreamError {
    fn public_message(&self) -> String {
        match self.status {
            Some(429) => "The AI provider is rate limiting requests. Please try again shortly.".into(),
            Some(code) if (500..=599).contains(&code) => {
                "The AI provider is temporarily unavailable. Please try again.".into()
            }
            Some(401) | Some(403) => "The AI provider rejected the service credentials.".into(),
            Some(_) => "The AI provider rejected the request.".into(),
            None => "The connection to the AI provider was interrupted.".into(),
        }
    }
}
