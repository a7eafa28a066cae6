//! HTTP client for the streaming completion endpoint.

use crate::{StreamController, StreamSnapshot};
use bytes::Bytes;
use futures::Stream;
use parking_lot::Mutex;
use serde::Deserialize;
use std::pin::Pin;
use tributary_core::GenerateBody;
use tributary_error::{
    HttpError, RateLimitError, RateLimitErrorKind, TributaryResult, ValidationError,
    ValidationErrorKind,
};
use tracing::{debug, error, instrument};

/// Path of the streaming endpoint relative to the base URL.
pub const GENERATE_PATH: &str = "/api/ai/generate";

/// Header carrying the authenticated principal.
pub const PRINCIPAL_HEADER: &str = "x-principal-id";

/// Response body bytes of an accepted streaming request.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    window: Option<String>,
    #[serde(default)]
    reset_at: Option<u64>,
}

/// Issues streaming completion requests on behalf of one principal.
#[derive(Debug, Clone)]
pub struct StreamClient {
    http: reqwest::Client,
    base_url: String,
    principal_id: String,
}

impl StreamClient {
    /// Create a client for the service at `base_url`.
    pub fn new(base_url: impl Into<String>, principal_id: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            principal_id: principal_id.into(),
        }
    }

    /// Use a preconfigured reqwest client.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// The principal sent with every request.
    pub fn principal_id(&self) -> &str {
        &self.principal_id
    }

    /// POST the request and return the event-stream body.
    ///
    /// # Errors
    ///
    /// Rejections the service reports before streaming are returned here
    /// rather than as frames:
    /// - `400` becomes a [`ValidationError`]
    /// - `429` becomes a [`RateLimitError`] carrying the reset time
    /// - any other non-2xx status or connection failure becomes an [`HttpError`]
    #[instrument(skip(self, body), fields(principal_id = %self.principal_id))]
    pub async fn open(&self, body: &GenerateBody) -> TributaryResult<ByteStream> {
        let url = format!("{}{}", self.base_url, GENERATE_PATH);
        debug!(url = %url, "Opening completion stream");

        let response = self
            .http
            .post(&url)
            .header(PRINCIPAL_HEADER, &self.principal_id)
            .header("Accept", "text/event-stream")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Request failed");
                HttpError::new(format!("Request failed: {}", e))
            })?;

        let status = response.status();
        if status.is_success() {
            debug!(status = %status, "Stream accepted");
            return Ok(Box::pin(response.bytes_stream()));
        }

        let text = response.text().await.unwrap_or_default();
        let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
        let message = body
            .error
            .unwrap_or_else(|| format!("Service returned {}", status));
        error!(status = %status, message = %message, "Stream rejected");

        Err(match status.as_u16() {
            400 => ValidationError::new(ValidationErrorKind::MalformedBody(message)).into(),
            429 => RateLimitError::new(RateLimitErrorKind::Exceeded {
                window: body.window.unwrap_or_else(|| "unknown".to_string()),
                reset_at_ms: body.reset_at.unwrap_or(0),
            })
            .into(),
            code => HttpError::new(message).with_status(code).into(),
        })
    }
}

/// A client, a controller, and the last request, for one UI surface.
///
/// # Examples
///
/// ```no_run
/// use tributary_core::{GenerateBody, RequestKind};
/// use tributary_stream::{StreamClient, StreamSession};
///
/// # async fn run() -> tributary_error::TributaryResult<()> {
/// let session = StreamSession::new(StreamClient::new("http://localhost:3000", "user-1"));
/// session.start(GenerateBody::new("Eco dog food", RequestKind::Headline)).await?;
/// let finished = session.controller().wait_terminal().await;
/// println!("{}", finished.text());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct StreamSession {
    client: StreamClient,
    controller: StreamController,
    last_request: Mutex<Option<GenerateBody>>,
}

impl StreamSession {
    /// Create an idle session.
    pub fn new(client: StreamClient) -> Self {
        Self {
            client,
            controller: StreamController::new(),
            last_request: Mutex::new(None),
        }
    }

    /// The controller driven by this session.
    pub fn controller(&self) -> &StreamController {
        &self.controller
    }

    /// Current snapshot of the controller.
    pub fn snapshot(&self) -> StreamSnapshot {
        self.controller.snapshot()
    }

    /// Cancel any running stream, issue `body`, and start reading the reply.
    ///
    /// # Errors
    ///
    /// Returns the synchronous rejection from [`StreamClient::open`]; the
    /// controller is left as cancellation left it.
    #[instrument(skip_all)]
    pub async fn start(&self, body: GenerateBody) -> TributaryResult<()> {
        self.controller.cancel();
        *self.last_request.lock() = Some(body.clone());
        let stream = self.client.open(&body).await?;
        self.controller.start_stream(stream);
        Ok(())
    }

    /// Re-issue the last request.
    ///
    /// # Errors
    ///
    /// Fails with a validation error if nothing was started yet, otherwise as
    /// [`start`](Self::start).
    pub async fn retry(&self) -> TributaryResult<()> {
        let last = self.last_request.lock().clone();
        match last {
            Some(body) => self.start(body).await,
            None => Err(ValidationError::new(ValidationErrorKind::MissingField(
                "previous request".to_string(),
            ))
            .into()),
        }
    }

    /// Cancel the running stream.
    pub fn cancel(&self) -> bool {
        self.controller.cancel()
    }

    /// Clear the controller back to `Idle`.
    pub fn reset(&self) {
        self.controller.reset();
    }
}
