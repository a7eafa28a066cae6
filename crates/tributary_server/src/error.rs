//! HTTP error responses.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use tributary_error::{PublicMessage, TributaryError, UpstreamError, ValidationError};
use tributary_rate_limit::RateLimitDecision;
use tracing::{error, warn};

/// Message returned with every 429.
pub const RATE_LIMITED_MESSAGE: &str = "Rate limit exceeded";

/// Failure of a request before any stream bytes are sent.
///
/// Once streaming has begun, failures travel in-band as error frames instead.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum ApiError {
    /// The authentication layer did not supply a principal
    #[display("Missing principal")]
    MissingPrincipal,

    /// The request body or query was rejected
    #[display("{}", _0)]
    Validation(ValidationError),

    /// A rate-limit window is exhausted
    #[display("Rate limited by {} window until {}", window, reset_at_ms)]
    RateLimited {
        /// Window that rejected the request
        window: String,
        /// Epoch milliseconds when that window resets
        reset_at_ms: u64,
        /// Whole seconds until the reset, at least one
        retry_after_secs: u64,
    },

    /// The provider failed before the first frame
    #[display("{}", _0)]
    Upstream(UpstreamError),

    /// Anything else
    #[display("{}", _0)]
    Internal(TributaryError),
}

impl ApiError {
    /// Build a 429 from a rejecting decision, relative to `now_ms`.
    pub fn rate_limited(decision: &RateLimitDecision, now_ms: u64) -> Self {
        let wait_ms = decision.reset_at_ms.saturating_sub(now_ms);
        Self::RateLimited {
            window: decision
                .limited_by
                .map(|kind| kind.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            reset_at_ms: decision.reset_at_ms,
            retry_after_secs: wait_ms.div_ceil(1000).max(1),
        }
    }

    /// Status code of the response.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingPrincipal => StatusCode::UNAUTHORIZED,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        Self::Upstream(err)
    }
}

impl From<TributaryError> for ApiError {
    fn from(err: TributaryError) -> Self {
        Self::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::MissingPrincipal => {
                (status, Json(json!({ "error": "Unauthorized" }))).into_response()
            }
            Self::Validation(err) => {
                (status, Json(json!({ "error": err.kind().to_string() }))).into_response()
            }
            Self::RateLimited {
                window,
                reset_at_ms,
                retry_after_secs,
            } => {
                let body = json!({
                    "error": RATE_LIMITED_MESSAGE,
                    "window": window,
                    "resetAt": reset_at_ms,
                });
                let mut response = (status, Json(body)).into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
                response
            }
            Self::Upstream(err) => {
                warn!(error = %err, "Provider failed before streaming");
                (status, Json(json!({ "error": err.public_message() }))).into_response()
            }
            Self::Internal(err) => {
                error!(error = %err, "Request failed");
                (status, Json(json!({ "error": "Internal server error" }))).into_response()
            }
        }
    }
}
