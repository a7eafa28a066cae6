//! Client-side incremental frame decoder.

use crate::{LineBuffer, StreamFrame};
use tracing::debug;

/// Message of the frame synthesized when the transport ends without a terminal frame.
pub const UNEXPECTED_END_MESSAGE: &str = "stream ended unexpectedly";

/// Reconstructs [`StreamFrame`]s from arbitrarily chunked transport bytes.
///
/// Frames come out in wire order regardless of how the bytes were split.
/// Lines without the `data:` prefix and payloads that do not parse are
/// dropped. Once a terminal frame has been produced, further input is
/// ignored.
///
/// # Examples
///
/// ```
/// use tributary_stream::{FrameDecoder, StreamFrame};
///
/// let mut decoder = FrameDecoder::new();
/// assert!(decoder.feed(b"data: {\"content\":\"Hel").is_empty());
/// assert_eq!(
///     decoder.feed(b"\"}\n\ndata: {\"done\":true}\n\n"),
///     vec![StreamFrame::Content("Hel".into()), StreamFrame::Done]
/// );
/// assert!(decoder.finish().is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct FrameDecoder {
    lines: LineBuffer,
    terminated: bool,
}

impl FrameDecoder {
    /// Create a decoder with an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// True once a terminal frame has been returned.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Feed one transport chunk, returning the frames it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamFrame> {
        if self.terminated {
            return Vec::new();
        }

        let mut frames = Vec::new();
        for line in self.lines.push(chunk) {
            if let Some(frame) = parse_line(&line) {
                let terminal = frame.is_terminal();
                frames.push(frame);
                if terminal {
                    self.terminate();
                    break;
                }
            }
        }
        frames
    }

    /// Signal end of transport.
    ///
    /// If no terminal frame was seen, the buffered final line is parsed and,
    /// failing a terminal frame there, an `Error` frame is synthesized. The
    /// result therefore ends with exactly one terminal frame, or is empty when
    /// the stream had already terminated.
    pub fn finish(&mut self) -> Vec<StreamFrame> {
        if self.terminated {
            return Vec::new();
        }

        let mut frames = Vec::new();
        if let Some(frame) = self.lines.take_remainder().as_deref().and_then(parse_line) {
            frames.push(frame);
        }
        if !frames.last().is_some_and(StreamFrame::is_terminal) {
            debug!("Transport ended without terminal frame");
            frames.push(StreamFrame::Error(UNEXPECTED_END_MESSAGE.to_string()));
        }

        self.terminate();
        frames
    }

    fn terminate(&mut self) {
        self.terminated = true;
        self.lines.clear();
    }
}

fn parse_line(line: &str) -> Option<StreamFrame> {
    match StreamFrame::from_line(line)? {
        Ok(frame) => Some(frame),
        Err(err) => {
            debug!(error = %err, "Dropping unparseable frame");
            None
        }
    }
}
