//! Error types for the Tributary streaming completion pipeline.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - Constructors use `#[track_caller]` for automatic location capture
//!
//! | Error | Raised when | Retried |
//! |---|---|---|
//! | [`ValidationError`] | request fields missing or invalid | never |
//! | [`RateLimitError`] | a principal exhausted a window | not before the reset time |
//! | [`UpstreamError`] | the model provider failed | internally, up to the attempt ceiling |
//! | [`StreamError`] | a frame was malformed, the server reported a failure, the transport broke, or the caller cancelled | user initiated |
//!
//! # Examples
//!
//! ```
//! use tributary_error::{TributaryResult, UpstreamError};
//!
//! fn call_provider() -> TributaryResult<String> {
//!     Err(UpstreamError::from_status(502, "Bad gateway"))?
//! }
//!
//! assert!(call_provider().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod http;
mod rate_limit;
mod stream;
mod upstream;
mod validation;

pub use config::ConfigError;
pub use error::{TributaryError, TributaryErrorKind, TributaryResult};
pub use http::HttpError;
pub use rate_limit::{RateLimitError, RateLimitErrorKind};
pub use stream::{StreamError, StreamErrorKind};
pub use upstream::{PublicMessage, RetryableError, UpstreamError, is_retryable_status};
pub use validation::{ValidationError, ValidationErrorKind};
