//! The seam between the service and a completion provider.

use async_trait::async_trait;
use futures::Stream;
use std::fmt::Debug;
use std::pin::Pin;
use tributary_core::ModelId;
use tributary_error::UpstreamError;

/// Text deltas of one streamed completion.
pub type ProviderStream = Pin<Box<dyn Stream<Item = Result<String, UpstreamError>> + Send>>;

/// One fully rendered completion call.
#[derive(Debug, Clone, PartialEq, derive_getters::Getters, derive_builder::Builder)]
#[builder(setter(into))]
pub struct CompletionCall {
    /// System instructions from the prompt template
    system_text: String,
    /// User message: template prefix plus the user's prompt
    user_text: String,
    /// Upstream model
    model_id: ModelId,
    /// Maximum tokens to generate
    max_tokens: u32,
    /// Sampling temperature
    temperature: f32,
}

impl CompletionCall {
    /// Create a call from its parts.
    pub fn new(
        system_text: impl Into<String>,
        user_text: impl Into<String>,
        model_id: ModelId,
        max_tokens: u32,
        temperature: f32,
    ) -> Self {
        Self {
            system_text: system_text.into(),
            user_text: user_text.into(),
            model_id,
            max_tokens,
            temperature,
        }
    }
}

/// A provider that can stream a chat completion.
///
/// Implementations open the stream (connection and response status) inside
/// [`open_stream`](CompletionProvider::open_stream); failures there are
/// candidates for retry. Failures after the stream opened are yielded as
/// `Err` items.
#[async_trait]
pub trait CompletionProvider: Send + Sync + Debug {
    /// Short name used in logs.
    fn provider_name(&self) -> &'static str;

    /// Start a streamed completion.
    async fn open_stream(&self, call: &CompletionCall) -> Result<ProviderStream, UpstreamError>;
}
