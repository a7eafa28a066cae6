//! Retrying, throttled access to a completion provider.

use crate::{CompletionCall, CompletionProvider, ProviderStream, RetryPolicy};
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tributary_core::ModelId;
use tributary_error::UpstreamError;
use tributary_rate_limit::{ProviderThrottle, ThrottleGuard};
use tracing::{debug, instrument};

/// Opens streamed completions with retry and an optional outbound throttle.
///
/// Retry covers opening the stream. Once deltas flow, a failure is yielded
/// by the stream and never restarted here.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tributary_core::ModelId;
/// use tributary_models::{OpenAiProvider, UpstreamClient};
///
/// # async fn run() -> Result<(), tributary_error::UpstreamError> {
/// let provider = OpenAiProvider::new("https://api.openai.com/v1", Some("sk-...".into()));
/// let client = UpstreamClient::new(Arc::new(provider));
/// let deltas = client
///     .complete("You write headlines.", "Dog food", ModelId::Gpt4oMini, 200, 0.7)
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    provider: Arc<dyn CompletionProvider>,
    retry: RetryPolicy,
    throttle: Option<ProviderThrottle>,
}

impl UpstreamClient {
    /// Wrap a provider with the default retry policy and no throttle.
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            provider,
            retry: RetryPolicy::default(),
            throttle: None,
        }
    }

    /// Replace the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Guard every attempt with an outbound throttle.
    pub fn with_throttle(mut self, throttle: ProviderThrottle) -> Self {
        self.throttle = Some(throttle);
        self
    }

    /// The retry policy in use.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Stream a completion for a rendered prompt.
    ///
    /// # Errors
    ///
    /// Returns the last [`UpstreamError`] once attempts are exhausted, or the
    /// first terminal one.
    pub async fn complete(
        &self,
        system_text: &str,
        user_text: &str,
        model_id: ModelId,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<ProviderStream, UpstreamError> {
        let call = CompletionCall::new(system_text, user_text, model_id, max_tokens, temperature);
        self.complete_call(&call).await
    }

    /// Stream a completion for a prepared call.
    ///
    /// # Errors
    ///
    /// As [`complete`](Self::complete).
    #[instrument(
        skip(self, call),
        fields(provider = self.provider.provider_name(), model = %call.model_id())
    )]
    pub async fn complete_call(&self, call: &CompletionCall) -> Result<ProviderStream, UpstreamError> {
        self.retry
            .run(|attempt| async move {
                let guard = match &self.throttle {
                    Some(throttle) => Some(throttle.acquire().await),
                    None => None,
                };
                debug!(attempt, "Opening provider stream");
                let stream = self.provider.open_stream(call).await?;
                Ok::<_, UpstreamError>(match guard {
                    Some(guard) => Box::pin(Guarded {
                        inner: stream,
                        _guard: guard,
                    }) as ProviderStream,
                    None => stream,
                })
            })
            .await
    }
}

/// Provider stream that holds its throttle slot until dropped.
struct Guarded {
    inner: ProviderStream,
    _guard: ThrottleGuard,
}

impl Stream for Guarded {
    type Item = Result<String, UpstreamError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().inner.poll_next_unpin(cx)
    }
}
