//! OpenAI-compatible streaming chat completion provider.

use crate::dto::{ChatCompletionChunk, ChatCompletionRequest, ErrorEnvelope, Message};
use crate::{CompletionCall, CompletionProvider, ProviderStream, UpstreamConfig};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt, stream};
use std::collections::VecDeque;
use std::pin::Pin;
use tributary_error::{ConfigError, UpstreamError};
use tributary_stream::LineBuffer;
use tracing::{debug, error, instrument, warn};

const DONE_SENTINEL: &str = "[DONE]";

/// Client for `POST {base_url}/chat/completions` with `stream: true`.
#[derive(Clone)]
pub struct OpenAiProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("base_url", &self.base_url)
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

impl OpenAiProvider {
    /// Create a provider with a default reqwest client.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Create a provider from configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the HTTP client cannot be built.
    #[instrument(skip(config), fields(base_url = %config.base_url()))]
    pub fn from_config(config: &UpstreamConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| ConfigError::new(format!("Failed to build HTTP client: {}", e)))?;
        if config.api_key().is_none() {
            warn!("No provider API key configured");
        }
        debug!("Creating OpenAI-compatible provider");
        Ok(Self {
            http,
            base_url: config.base_url().trim_end_matches('/').to_string(),
            api_key: config.api_key().clone(),
        })
    }

    fn chat_request(call: &CompletionCall) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: call.model_id().to_string(),
            messages: vec![
                Message::system(call.system_text()),
                Message::user(call.user_text()),
            ],
            max_tokens: Some(*call.max_tokens()),
            temperature: Some(*call.temperature()),
            stream: Some(true),
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn provider_name(&self) -> &'static str {
        "openai"
    }

    #[instrument(skip(self, call), fields(model = %call.model_id()))]
    async fn open_stream(&self, call: &CompletionCall) -> Result<ProviderStream, UpstreamError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(url = %url, "Sending streaming chat completion request");

        let mut req = self
            .http
            .post(&url)
            .json(&Self::chat_request(call))
            .header("Accept", "text/event-stream");
        if let Some(api_key) = &self.api_key {
            req = req.bearer_auth(api_key);
        }

        let response = req.send().await.map_err(|e| {
            error!(error = %e, "Request failed");
            UpstreamError::network(format!("Request failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or_else(|_| format!("Provider returned {}", status));
            error!(status = %status, message = %message, "Provider returned error");
            return Err(UpstreamError::from_status(status.as_u16(), message));
        }

        debug!("Streaming request accepted, parsing SSE stream");
        Ok(parse_sse_stream(response.bytes_stream()))
    }
}

type BodyStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

struct SseState {
    body: BodyStream,
    lines: LineBuffer,
    pending: VecDeque<Result<String, UpstreamError>>,
    finished: bool,
}

impl SseState {
    fn handle_line(&mut self, line: &str) {
        if self.finished {
            return;
        }
        let Some(data) = line.strip_prefix("data:").map(str::trim) else {
            return;
        };
        if data.is_empty() {
            return;
        }
        if data == DONE_SENTINEL {
            self.finished = true;
            return;
        }

        if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(data) {
            self.fail(UpstreamError::network(envelope.error.message));
            return;
        }

        match serde_json::from_str::<ChatCompletionChunk>(data) {
            Ok(chunk) => {
                if let Some(delta) = chunk.first_delta().filter(|delta| !delta.is_empty()) {
                    self.pending.push_back(Ok(delta.to_string()));
                }
            }
            Err(e) => {
                self.fail(UpstreamError::network(format!("Failed to parse chunk: {}", e)));
            }
        }
    }

    fn fail(&mut self, error: UpstreamError) {
        warn!(error = %error, "Provider stream failed");
        self.pending.push_back(Err(error));
        self.finished = true;
    }
}

/// Parse the provider's Server-Sent Events body into text deltas.
///
/// Ends at `data: [DONE]`. A transport failure or undecodable chunk yields
/// one `Err` and ends the stream.
pub(crate) fn parse_sse_stream<S>(body: S) -> ProviderStream
where
    S: Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
{
    let state = SseState {
        body: Box::pin(body),
        lines: LineBuffer::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }
            match state.body.next().await {
                Some(Ok(bytes)) => {
                    for line in state.lines.push(&bytes) {
                        state.handle_line(&line);
                    }
                }
                Some(Err(e)) => {
                    state.fail(UpstreamError::network(format!("Stream error: {}", e)));
                }
                None => {
                    if let Some(rest) = state.lines.take_remainder() {
                        state.handle_line(&rest);
                    }
                    // A body that closes without [DONE] is treated as complete.
                    state.finished = true;
                }
            }
        }
    }))
}
