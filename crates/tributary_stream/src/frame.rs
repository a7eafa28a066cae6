//! Wire frames exchanged between the service and the browser.

use serde_json::{Value, json};
use tributary_error::{StreamError, StreamErrorKind};

/// Prefix that marks a line as carrying a frame.
pub const DATA_PREFIX: &str = "data:";

/// One event of the completion stream.
///
/// A stream carries zero or more [`Content`](StreamFrame::Content) frames
/// followed by exactly one terminal frame ([`Done`](StreamFrame::Done) or
/// [`Error`](StreamFrame::Error)). Nothing follows the terminal frame.
///
/// # Examples
///
/// ```
/// use tributary_stream::StreamFrame;
///
/// assert_eq!(
///     StreamFrame::Content("Hel".into()).to_wire(),
///     "data: {\"content\":\"Hel\"}\n\n"
/// );
/// assert_eq!(StreamFrame::Done.to_wire(), "data: {\"done\":true}\n\n");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StreamFrame {
    /// A fragment of generated text
    Content(String),
    /// The completion finished successfully
    Done,
    /// The completion failed; carries a user-facing message
    Error(String),
}

impl StreamFrame {
    /// True for `Done` and `Error`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamFrame::Content(_))
    }

    /// JSON payload of the frame, without the `data:` prefix.
    pub fn to_json(&self) -> String {
        let payload = match self {
            StreamFrame::Content(text) => json!({ "content": text }),
            StreamFrame::Done => json!({ "done": true }),
            StreamFrame::Error(message) => json!({ "error": message }),
        };
        payload.to_string()
    }

    /// Full SSE rendering: `data: <json>` followed by a blank line.
    pub fn to_wire(&self) -> String {
        format!("{} {}\n\n", DATA_PREFIX, self.to_json())
    }

    /// Parse a JSON payload.
    ///
    /// An `error` member wins over `done`, which wins over `content`.
    ///
    /// # Errors
    ///
    /// Returns a protocol error for invalid JSON or a payload with none of
    /// the recognised members.
    #[track_caller]
    pub fn from_json(payload: &str) -> Result<Self, StreamError> {
        let value: Value = serde_json::from_str(payload).map_err(|e| {
            StreamError::new(StreamErrorKind::Protocol(format!("invalid frame JSON: {}", e)))
        })?;

        if let Some(message) = value.get("error").and_then(Value::as_str) {
            return Ok(StreamFrame::Error(message.to_string()));
        }
        if value.get("done").and_then(Value::as_bool) == Some(true) {
            return Ok(StreamFrame::Done);
        }
        if let Some(text) = value.get("content").and_then(Value::as_str) {
            return Ok(StreamFrame::Content(text.to_string()));
        }

        Err(StreamError::new(StreamErrorKind::Protocol(format!(
            "unrecognised frame: {}",
            payload
        ))))
    }

    /// Parse one protocol line.
    ///
    /// Returns `None` for lines that do not carry the `data:` prefix (blank
    /// separators, SSE comments, `event:` fields).
    pub fn from_line(line: &str) -> Option<Result<Self, StreamError>> {
        let payload = line.strip_prefix(DATA_PREFIX)?;
        Some(Self::from_json(payload.trim_start()))
    }
}
