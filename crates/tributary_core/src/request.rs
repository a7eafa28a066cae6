//! Completion request types.

use crate::{ModelId, RequestKind};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tributary_error::{ValidationError, ValidationErrorKind};

/// Default completion length when the caller does not specify one.
pub const DEFAULT_MAX_TOKENS: u32 = 2000;

/// Default sampling temperature when the caller does not specify one.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// A validated request for one streamed completion.
///
/// Created once per user action and consumed by a single upstream call.
///
/// # Examples
///
/// ```
/// use tributary_core::{CompletionRequestBuilder, ModelId, RequestKind};
///
/// let request = CompletionRequestBuilder::default()
///     .prompt_text("Organic dog food subscription")
///     .request_kind(RequestKind::Headline)
///     .model_id(ModelId::Gpt4o)
///     .build()
///     .unwrap();
///
/// assert_eq!(*request.max_tokens(), 2000);
/// assert_eq!(*request.model_id(), ModelId::Gpt4o);
/// ```
#[derive(Debug, Clone, PartialEq, derive_getters::Getters, derive_builder::Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct CompletionRequest {
    /// The user's prompt text
    #[builder(setter(into))]
    prompt_text: String,
    /// Which prompt template to apply
    request_kind: RequestKind,
    /// Upstream model
    #[builder(default)]
    model_id: ModelId,
    /// Maximum tokens to generate
    #[builder(default = "DEFAULT_MAX_TOKENS")]
    max_tokens: u32,
    /// Sampling temperature (0.0 - 2.0)
    #[builder(default = "DEFAULT_TEMPERATURE")]
    temperature: f32,
}

impl CompletionRequestBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.prompt_text.as_ref().is_some_and(|p| p.trim().is_empty()) {
            return Err("prompt must not be empty".to_string());
        }
        if self.max_tokens == Some(0) {
            return Err("max_tokens must be greater than zero".to_string());
        }
        match self.temperature {
            Some(t) if !(0.0..=2.0).contains(&t) => {
                Err(format!("temperature must be within [0, 2], got {t}"))
            }
            _ => Ok(()),
        }
    }
}

/// Bounds and defaults applied when turning a wire body into a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct RequestLimits {
    /// Model used when the body omits `model`
    #[serde(default)]
    default_model: ModelId,
    /// `maxTokens` used when the body omits it
    #[serde(default = "default_max_tokens")]
    default_max_tokens: u32,
    /// Largest accepted `maxTokens`
    #[serde(default = "default_max_tokens_ceiling")]
    max_tokens_ceiling: u32,
    /// `temperature` used when the body omits it
    #[serde(default = "default_temperature")]
    default_temperature: f32,
    /// Longest accepted prompt, in characters
    #[serde(default = "default_max_prompt_chars")]
    max_prompt_chars: usize,
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_max_tokens_ceiling() -> u32 {
    16_384
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_max_prompt_chars() -> usize {
    20_000
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            default_model: ModelId::default(),
            default_max_tokens: default_max_tokens(),
            max_tokens_ceiling: default_max_tokens_ceiling(),
            default_temperature: default_temperature(),
            max_prompt_chars: default_max_prompt_chars(),
        }
    }
}

impl RequestLimits {
    /// Override the largest accepted `maxTokens`.
    pub fn with_max_tokens_ceiling(mut self, ceiling: u32) -> Self {
        self.max_tokens_ceiling = ceiling;
        self
    }

    /// Override the longest accepted prompt.
    pub fn with_max_prompt_chars(mut self, chars: usize) -> Self {
        self.max_prompt_chars = chars;
        self
    }
}

/// JSON body of a streaming completion request as sent by the browser.
///
/// Every field is optional on the wire so that missing fields surface as
/// [`ValidationError`]s instead of opaque deserialization failures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBody {
    /// User prompt text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Request kind wire name, e.g. `mainVSL`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_type: Option<String>,
    /// Model wire name, e.g. `gpt-4o-mini`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<i64>,
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

impl GenerateBody {
    /// Body with the two required fields set.
    pub fn new(prompt: impl Into<String>, kind: RequestKind) -> Self {
        Self {
            prompt: Some(prompt.into()),
            prompt_type: Some(kind.to_string()),
            ..Default::default()
        }
    }

    /// Set the model wire name.
    pub fn with_model(mut self, model: ModelId) -> Self {
        self.model = Some(model.to_string());
        self
    }

    /// Set the maximum tokens.
    pub fn with_max_tokens(mut self, max_tokens: i64) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Validate the body and produce a [`CompletionRequest`].
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming the first offending field.
    pub fn into_request(self, limits: &RequestLimits) -> Result<CompletionRequest, ValidationError> {
        let prompt = self
            .prompt
            .ok_or_else(|| ValidationError::new(ValidationErrorKind::MissingField("prompt".into())))?;
        let prompt_type = self.prompt_type.ok_or_else(|| {
            ValidationError::new(ValidationErrorKind::MissingField("promptType".into()))
        })?;

        if prompt.trim().is_empty() {
            return Err(ValidationError::invalid("prompt", "must not be empty"));
        }
        let prompt_chars = prompt.chars().count();
        if prompt_chars > limits.max_prompt_chars {
            return Err(ValidationError::invalid(
                "prompt",
                format!(
                    "must be at most {} characters, got {}",
                    limits.max_prompt_chars, prompt_chars
                ),
            ));
        }

        let kind = RequestKind::from_str(&prompt_type)
            .map_err(|_| ValidationError::new(ValidationErrorKind::UnknownPromptType(prompt_type)))?;

        let model = match self.model {
            Some(name) => ModelId::from_str(&name)
                .map_err(|_| ValidationError::new(ValidationErrorKind::UnknownModel(name)))?,
            None => limits.default_model,
        };

        let max_tokens = match self.max_tokens {
            Some(value) if value < 1 || value > i64::from(limits.max_tokens_ceiling) => {
                return Err(ValidationError::invalid(
                    "maxTokens",
                    format!("must be within 1..={}, got {}", limits.max_tokens_ceiling, value),
                ));
            }
            Some(value) => value as u32,
            None => limits.default_max_tokens,
        };

        let temperature = match self.temperature {
            Some(value) if !(0.0..=2.0).contains(&value) => {
                return Err(ValidationError::invalid(
                    "temperature",
                    format!("must be within [0, 2], got {value}"),
                ));
            }
            Some(value) => value as f32,
            None => limits.default_temperature,
        };

        CompletionRequestBuilder::default()
            .prompt_text(prompt)
            .request_kind(kind)
            .model_id(model)
            .max_tokens(max_tokens)
            .temperature(temperature)
            .build()
            .map_err(|e| ValidationError::invalid("request", e.to_string()))
    }
}
