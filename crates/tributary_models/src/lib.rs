//! Upstream completion providers for Tributary.
//!
//! [`UpstreamClient`] is the entry point: it renders a [`CompletionCall`],
//! retries transient failures per [`RetryPolicy`], optionally waits on a
//! [`ProviderThrottle`](tributary_rate_limit::ProviderThrottle), and hands
//! back a [`ProviderStream`] of text deltas. [`OpenAiProvider`] speaks the
//! OpenAI-compatible streaming chat completion API.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod config;
mod dto;
mod openai;
mod provider;
mod retry;

pub use client::UpstreamClient;
pub use config::{DEFAULT_BASE_URL, UpstreamConfig};
pub use dto::{ChatCompletionChunk, ChatCompletionRequest, ChunkChoice, Delta, Message};
pub use openai::OpenAiProvider;
pub use provider::{
    CompletionCall, CompletionCallBuilder, CompletionCallBuilderError, CompletionProvider,
    ProviderStream,
};
pub use retry::RetryPolicy;
