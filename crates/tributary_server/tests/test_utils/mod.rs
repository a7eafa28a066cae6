//! Test utilities for router tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use futures::stream;
use http_body_util::BodyExt;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;
use tributary_error::UpstreamError;
use tributary_models::{CompletionCall, CompletionProvider, ProviderStream, RetryPolicy, UpstreamClient};
use tributary_rate_limit::{
    InMemoryRateLimitStore, ManualClock, RateLimitPolicy, RateLimiter, WindowConfig, WindowKind,
};
use tributary_server::{AppState, InMemoryUsageSink, router};
use tributary_stream::{GENERATE_PATH, PRINCIPAL_HEADER};

/// Epoch milliseconds the test clock starts at.
pub const START_MS: u64 = 1_700_000_000_000;

/// One provider call: either the open fails, or a scripted delta sequence.
pub type Step = Result<Vec<Result<String, UpstreamError>>, UpstreamError>;

/// Step streaming the given deltas and then ending cleanly.
pub fn deltas(parts: &[&str]) -> Step {
    Ok(parts.iter().map(|part| Ok(part.to_string())).collect())
}

/// Provider replaying a script, one step per call.
#[derive(Debug, Default)]
pub struct StubProvider {
    script: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
}

impl StubProvider {
    pub fn new(script: Vec<Step>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionProvider for StubProvider {
    fn provider_name(&self) -> &'static str {
        "stub"
    }

    async fn open_stream(&self, _call: &CompletionCall) -> Result<ProviderStream, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(UpstreamError::network("script exhausted")));
        Ok(Box::pin(stream::iter(step?)))
    }
}

/// Router plus the handles tests inspect.
pub struct Harness {
    pub app: Router,
    pub provider: Arc<StubProvider>,
    pub usage: Arc<InMemoryUsageSink>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    /// Harness allowing `per_minute` requests per principal.
    pub fn new(script: Vec<Step>, per_minute: u32) -> Self {
        let provider = Arc::new(StubProvider::new(script));
        let usage = Arc::new(InMemoryUsageSink::new());
        let clock = Arc::new(ManualClock::new(START_MS));

        let policy = RateLimitPolicy::new(vec![WindowConfig::new(WindowKind::Minute, per_minute)])
            .expect("valid policy");
        let limiter = RateLimiter::new(policy, Arc::new(InMemoryRateLimitStore::new()))
            .with_clock(clock.clone());
        let upstream = UpstreamClient::new(provider.clone())
            .with_retry_policy(RetryPolicy::new(3, Duration::from_millis(1)));
        let state = AppState::new(limiter, upstream, usage.clone());

        Self {
            app: router(state),
            provider,
            usage,
            clock,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.expect("router is infallible")
    }

    /// Wait for the usage sink to hold `count` records.
    pub async fn wait_for_usage(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.usage.len() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("usage recorded in time");
    }
}

/// POST to the generate route as `principal`.
pub fn generate_request(principal: Option<&str>, body: impl Into<String>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(GENERATE_PATH)
        .header("content-type", "application/json");
    if let Some(principal) = principal {
        builder = builder.header(PRINCIPAL_HEADER, principal);
    }
    builder.body(Body::from(body.into())).expect("valid request")
}

/// Read a whole body as UTF-8.
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body readable")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

/// Read a whole body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_text(response).await).expect("json body")
}
