use futures::StreamExt;
use httpmock::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tributary_core::ModelId;
use tributary_models::{
    CompletionCall, CompletionProvider, OpenAiProvider, RetryPolicy, UpstreamClient,
    UpstreamConfig,
};

fn chunk(content: &str) -> String {
    format!(
        "data: {}\n\n",
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion.chunk",
            "model": "gpt-4o-mini",
            "choices": [{"index": 0, "delta": {"content": content}, "finish_reason": null}]
        })
    )
}

fn call() -> CompletionCall {
    CompletionCall::new("You write headlines.", "Dog food", ModelId::Gpt4oMini, 50, 0.7)
}

fn provider(server: &MockServer) -> OpenAiProvider {
    let config = UpstreamConfig::default()
        .with_base_url(server.base_url())
        .with_api_key("test-key");
    OpenAiProvider::from_config(&config).expect("client builds")
}

#[tokio::test]
async fn streams_content_deltas_until_done() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let role_only = "data: {\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\"}}]}\n\n";
    let body = format!(
        ": processing\n\n{}{}{}data: [DONE]\n\n{}",
        role_only,
        chunk("Hel"),
        chunk("lo"),
        chunk("after done"),
    );
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .header("authorization", "Bearer test-key")
                .body_contains("\"stream\":true")
                .body_contains("\"model\":\"gpt-4o-mini\"")
                .body_contains("\"role\":\"system\"");
            then.status(200)
                .header("content-type", "text/event-stream")
                .body(body);
        })
        .await;

    let stream = provider(&server).open_stream(&call()).await?;
    let deltas: Vec<String> = stream
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect::<Result<_, _>>()?;

    assert_eq!(deltas, vec!["Hel".to_string(), "lo".to_string()]);
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn error_body_message_and_status_are_reported() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(401)
                .json_body(json!({"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}));
        })
        .await;

    let err = match provider(&server).open_stream(&call()).await {
        Ok(_) => panic!("401 must fail"),
        Err(err) => err,
    };

    assert_eq!(err.status, Some(401));
    assert_eq!(err.message, "Incorrect API key provided");
    assert!(!err.retryable);
}

#[tokio::test]
async fn server_errors_are_retried_until_exhausted() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(503).body("upstream overloaded");
        })
        .await;

    let client = UpstreamClient::new(Arc::new(provider(&server)))
        .with_retry_policy(RetryPolicy::new(3, Duration::from_millis(1)));
    let err = match client.complete_call(&call()).await {
        Ok(_) => panic!("503 must fail"),
        Err(err) => err,
    };

    assert!(err.retryable);
    assert_eq!(err.status, Some(503));
    assert!(err.message.contains("503"));
    mock.assert_hits_async(3).await;
}

#[tokio::test]
async fn undecodable_chunk_ends_stream_with_error() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200)
                .header("content-type", "text/event-stream")
                .body(format!("{}data: {{not json\n\n{}", chunk("ok"), chunk("lost")));
        })
        .await;

    let items: Vec<_> = provider(&server).open_stream(&call()).await?.collect().await;

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().ok().map(String::as_str), Some("ok"));
    let err = items[1].as_ref().err().expect("second item is an error");
    assert!(err.message.contains("Failed to parse chunk"));
    assert_eq!(err.status, None);
    Ok(())
}

#[tokio::test]
async fn mid_stream_error_event_is_surfaced() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200)
                .header("content-type", "text/event-stream")
                .body(format!(
                    "{}data: {}\n\n",
                    chunk("partial"),
                    json!({"error": {"message": "server had an error"}})
                ));
        })
        .await;

    let items: Vec<_> = provider(&server).open_stream(&call()).await?.collect().await;

    assert_eq!(items.len(), 2);
    assert_eq!(
        items[1].as_ref().err().map(|e| e.message.as_str()),
        Some("server had an error")
    );
    Ok(())
}
