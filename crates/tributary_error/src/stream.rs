//! Error types for the event stream between service and client.

/// Error kinds for stream decoding and lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
pub enum StreamErrorKind {
    /// A wire frame could not be understood
    #[display("Protocol error: {}", _0)]
    Protocol(String),

    /// The server ended the stream with an error frame
    #[display("{}", _0)]
    Remote(String),

    /// The transport failed while reading the stream
    #[display("Connection interrupted: {}", _0)]
    Transport(String),

    /// The caller cancelled the stream
    #[display("Stream cancelled")]
    Cancelled,
}

/// Stream error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Stream Error: {} at line {} in {}", kind, line, file)]
pub struct StreamError {
    /// The error kind
    pub kind: StreamErrorKind,
    /// Line number where error occurred
    pub line: u32,
    /// File where error occurred
    pub file: &'static str,
}

impl StreamError {
    /// Create a new StreamError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StreamErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// True if the stream ended because the caller asked for it.
    pub fn is_cancelled(&self) -> bool {
        self.kind == StreamErrorKind::Cancelled
    }
}
