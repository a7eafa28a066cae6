//! Request validation errors.

/// Specific validation failures for an incoming completion request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ValidationErrorKind {
    /// A required field was absent
    #[display("Missing required field: {}", _0)]
    MissingField(String),

    /// A field was present but out of range or malformed
    #[display("Invalid field value for '{}': {}", field, reason)]
    InvalidField {
        /// The field name as it appears on the wire
        field: String,
        /// Reason for invalidity
        reason: String,
    },

    /// The prompt type is not one of the known request kinds
    #[display("Unknown prompt type: {}", _0)]
    UnknownPromptType(String),

    /// The requested model is not supported
    #[display("Unknown model: {}", _0)]
    UnknownModel(String),

    /// The request body could not be parsed
    #[display("Malformed request body: {}", _0)]
    MalformedBody(String),
}

/// Validation error with location tracking.
///
/// Validation errors are raised before any side effect takes place and are
/// never retried.
///
/// # Examples
///
/// ```
/// use tributary_error::{ValidationError, ValidationErrorKind};
///
/// let err = ValidationError::new(ValidationErrorKind::MissingField("prompt".into()));
/// assert!(err.to_string().contains("prompt"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Validation Error: {} at line {} in {}", kind, line, file)]
pub struct ValidationError {
    kind: ValidationErrorKind,
    line: u32,
    file: &'static str,
}

impl ValidationError {
    /// Create a new validation error with caller location tracking.
    #[track_caller]
    pub fn new(kind: ValidationErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Shorthand for an [`ValidationErrorKind::InvalidField`] error.
    #[track_caller]
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ValidationErrorKind::InvalidField {
            field: field.into(),
            reason: reason.into(),
        })
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ValidationErrorKind {
        &self.kind
    }
}
