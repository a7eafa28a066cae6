use httpmock::prelude::*;
use serde_json::json;
use std::time::Duration;
use tributary_core::{GenerateBody, RequestKind};
use tributary_error::{RateLimitErrorKind, TributaryErrorKind};
use tributary_stream::{StreamClient, StreamFrame, StreamSession, StreamState};

fn event_stream(frames: &[StreamFrame]) -> String {
    frames.iter().map(StreamFrame::to_wire).collect()
}

#[tokio::test]
async fn session_streams_accepted_request_to_completion() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/ai/generate")
                .header("x-principal-id", "user-1")
                .json_body(json!({"prompt": "Dog food", "promptType": "headline"}));
            then.status(200)
                .header("content-type", "text/event-stream")
                .body(event_stream(&[
                    StreamFrame::Content("Hel".into()),
                    StreamFrame::Content("lo".into()),
                    StreamFrame::Done,
                ]));
        })
        .await;

    let session = StreamSession::new(StreamClient::new(server.base_url(), "user-1"));
    session
        .start(GenerateBody::new("Dog food", RequestKind::Headline))
        .await
        .expect("request accepted");

    let finished = tokio::time::timeout(Duration::from_secs(5), session.controller().wait_terminal())
        .await
        .expect("stream finished");
    assert_eq!(*finished.state(), StreamState::Completed);
    assert_eq!(finished.text(), "Hello");
    mock.assert_async().await;
}

#[tokio::test]
async fn rate_limited_request_is_rejected_synchronously() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/ai/generate");
            then.status(429)
                .header("retry-after", "42")
                .json_body(json!({
                    "error": "Rate limit exceeded",
                    "window": "minute",
                    "resetAt": 1_700_000_042_000u64
                }));
        })
        .await;

    let client = StreamClient::new(server.base_url(), "user-1");
    let err = match client
        .open(&GenerateBody::new("Dog food", RequestKind::Headline))
        .await
    {
        Ok(_) => panic!("rate limited request must fail"),
        Err(err) => err,
    };

    match err.kind() {
        TributaryErrorKind::RateLimit(limit) => match limit.kind() {
            RateLimitErrorKind::Exceeded { window, reset_at_ms } => {
                assert_eq!(window, "minute");
                assert_eq!(*reset_at_ms, 1_700_000_042_000);
            }
            other => panic!("unexpected rate limit kind: {other:?}"),
        },
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn validation_and_server_failures_map_to_error_kinds() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/ai/generate")
                .header("x-principal-id", "bad-request");
            then.status(400).json_body(json!({"error": "Unknown prompt type: poem"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/ai/generate")
                .header("x-principal-id", "gateway");
            then.status(502).json_body(json!({"error": "The AI provider is temporarily unavailable."}));
        })
        .await;

    let body = GenerateBody::new("Dog food", RequestKind::Headline);

    let err = match StreamClient::new(server.base_url(), "bad-request").open(&body).await {
        Ok(_) => panic!("expected validation error"),
        Err(err) => err,
    };
    assert!(matches!(err.kind(), TributaryErrorKind::Validation(_)));

    let err = match StreamClient::new(server.base_url(), "gateway").open(&body).await {
        Ok(_) => panic!("expected http error"),
        Err(err) => err,
    };
    match err.kind() {
        TributaryErrorKind::Http(http) => {
            assert_eq!(http.status, Some(502));
            assert!(http.message.contains("temporarily unavailable"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn retry_reissues_the_last_request() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/ai/generate");
            then.status(200)
                .header("content-type", "text/event-stream")
                .body(event_stream(&[
                    StreamFrame::Content("again".into()),
                    StreamFrame::Done,
                ]));
        })
        .await;

    let session = StreamSession::new(StreamClient::new(server.base_url(), "user-1"));
    assert!(session.retry().await.is_err());

    session
        .start(GenerateBody::new("Dog food", RequestKind::SalesPage))
        .await
        .expect("first request");
    session.controller().wait_terminal().await;

    session.retry().await.expect("retry accepted");
    let finished = tokio::time::timeout(Duration::from_secs(5), session.controller().wait_terminal())
        .await
        .expect("stream finished");
    assert_eq!(finished.text(), "again");
    mock.assert_hits_async(2).await;

    session.reset();
    assert_eq!(session.snapshot().state(), &StreamState::Idle);
}
