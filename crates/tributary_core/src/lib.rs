//! Core data types for the Tributary streaming completion pipeline.
//!
//! This crate provides the request model, prompt templates, the token/cost
//! estimator and usage records shared by the server and client crates.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod kind;
mod pricing;
mod prompt;
mod request;
mod telemetry;
mod token_counting;
mod usage;

pub use kind::{ModelId, RequestKind};
pub use pricing::{PricingEntry, PricingTable, estimate_tokens};
pub use prompt::{PromptLibrary, PromptTemplate, RenderedPrompt};
pub use request::{
    CompletionRequest, CompletionRequestBuilder, CompletionRequestBuilderError, DEFAULT_MAX_TOKENS,
    DEFAULT_TEMPERATURE, GenerateBody, RequestLimits,
};
pub use telemetry::{TracingConfig, init_tracing};
pub use token_counting::TokenUsage;
pub use usage::{UsageRecord, UsageTotals};
