//! HTTP service for streamed completions.
//!
//! Routes:
//! - `POST /api/ai/generate`: validate, rate limit, then stream frames as `text/event-stream`
//! - `GET /api/ai/usage`: usage totals for the calling principal
//! - `GET /health`: liveness
//!
//! The principal is taken from the `x-principal-id` header, which the
//! authentication layer in front of this service is trusted to set.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod routes;
mod state;
mod usage;

pub use config::{API_KEY_ENV, AppConfig, DEFAULT_CONFIG, ServerSettings};
pub use error::{ApiError, RATE_LIMITED_MESSAGE};
pub use routes::{USAGE_PATH, router};
pub use state::AppState;
pub use usage::{InMemoryUsageSink, UsageSink};
