//! HTTP routes.

use crate::{ApiError, AppState};
use axum::body::{Body, Bytes};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use tributary_core::{GenerateBody, TokenUsage, UsageRecord, estimate_tokens};
use tributary_error::{ValidationError, ValidationErrorKind};
use tributary_stream::{EncoderOutcome, FrameEncoder, GENERATE_PATH, PRINCIPAL_HEADER};
use tracing::{Instrument, Span, debug, info, instrument, warn};
use uuid::Uuid;

/// Path of the usage totals endpoint.
pub const USAGE_PATH: &str = "/api/ai/usage";

/// Build the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(GENERATE_PATH, post(generate))
        .route(USAGE_PATH, get(usage_totals))
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

fn principal_from(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(PRINCIPAL_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or(ApiError::MissingPrincipal)
}

/// Stream a completion as `text/event-stream`.
///
/// Validation, rate limiting and the provider handshake all happen before the
/// response head is sent, so each can still produce a plain JSON error.
#[instrument(
    skip_all,
    fields(request_id = %Uuid::new_v4(), principal_id = tracing::field::Empty)
)]
async fn generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let principal_id = principal_from(&headers)?;
    Span::current().record("principal_id", principal_id.as_str());

    let body: GenerateBody = serde_json::from_slice(&body).map_err(|e| {
        ValidationError::new(ValidationErrorKind::MalformedBody(e.to_string()))
    })?;
    let request = body.into_request(state.limits())?;

    let decision = state.limiter().check_and_consume(&principal_id);
    if !decision.allowed {
        return Err(ApiError::rate_limited(&decision, state.limiter().now_ms()));
    }

    let kind = *request.request_kind();
    let model = *request.model_id();
    let rendered = state
        .prompts()
        .render(kind, request.prompt_text())
        .ok_or_else(|| ValidationError::new(ValidationErrorKind::UnknownPromptType(kind.to_string())))?;

    let input_tokens = estimate_tokens(&rendered.system) + estimate_tokens(&rendered.user);
    info!(
        request_kind = %kind,
        model = %model,
        max_tokens = request.max_tokens(),
        input_tokens,
        "Starting completion stream"
    );

    let deltas = state
        .upstream()
        .complete(
            &rendered.system,
            &rendered.user,
            model,
            *request.max_tokens(),
            *request.temperature(),
        )
        .await?;

    let usage = state.usage().clone();
    let pricing = state.pricing().clone();
    let span = Span::current();
    let encoder = FrameEncoder::new(deltas).with_observer(move |outcome, output| {
        let _entered = span.enter();
        let output_tokens = estimate_tokens(&output);
        info!(%outcome, output_tokens, "Completion stream finished");

        if outcome != EncoderOutcome::Completed && output.is_empty() {
            debug!("Nothing was streamed, skipping usage record");
            return;
        }

        let record = UsageRecord::new(
            principal_id,
            model,
            kind,
            TokenUsage::new(input_tokens, output_tokens),
            &pricing,
            Utc::now(),
        );
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(
                    async move {
                        if let Err(err) = usage.record(record).await {
                            warn!(error = %err, "Failed to record usage");
                        }
                    }
                    .instrument(span.clone()),
                );
            }
            Err(_) => warn!("No runtime available, usage record dropped"),
        }
    });

    let body = Body::from_stream(encoder.map(|frame| Ok::<_, Infallible>(frame.to_wire())));
    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    Ok(response)
}

/// Half-open time range for usage totals. Missing bounds mean "since the
/// epoch" and "now".
#[derive(Debug, Deserialize)]
struct UsageQuery {
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
}

#[instrument(skip_all, fields(principal_id = tracing::field::Empty))]
async fn usage_totals(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<UsageQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let principal_id = principal_from(&headers)?;
    Span::current().record("principal_id", principal_id.as_str());

    let Query(query) = query.map_err(|rejection| ValidationError::invalid("query", rejection.body_text()))?;
    let from = query.from.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    let to = query.to.unwrap_or_else(Utc::now);
    if from > to {
        return Err(ValidationError::invalid("from", "must not be after 'to'").into());
    }

    let totals = state.usage().totals(&principal_id, from, to).await?;
    debug!(request_count = totals.request_count, "Usage totals computed");
    Ok((StatusCode::OK, Json(totals)).into_response())
}
