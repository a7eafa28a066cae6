//! Server-side adapter from provider deltas to wire frames.

use crate::StreamFrame;
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use tributary_error::PublicMessage;
use tracing::{debug, warn};

/// How an encoded stream ended.
#[derive(Debug, Clone, PartialEq, Eq, Hash, strum::Display)]
pub enum EncoderOutcome {
    /// The upstream finished and `Done` was emitted
    #[strum(to_string = "completed")]
    Completed,
    /// The upstream failed and `Error` was emitted
    #[strum(to_string = "failed")]
    Failed {
        /// Internal description of the failure, not the wire message
        message: String,
    },
    /// The encoder was dropped before a terminal frame, e.g. the client disconnected
    #[strum(to_string = "abandoned")]
    Abandoned,
}

/// Callback receiving the outcome and all content text emitted.
pub type EncoderObserver = Box<dyn FnOnce(EncoderOutcome, String) + Send + 'static>;

/// Lazy adapter turning a stream of text deltas into [`StreamFrame`]s.
///
/// The upstream is polled only when the consumer asks for the next frame.
/// Empty deltas are skipped. The first upstream error becomes one `Error`
/// frame carrying the error's public message; upstream exhaustion becomes one
/// `Done` frame. After the terminal frame the upstream is dropped and the
/// encoder yields nothing more.
///
/// # Examples
///
/// ```
/// use futures::{StreamExt, stream};
/// use tributary_error::UpstreamError;
/// use tributary_stream::{FrameEncoder, StreamFrame};
///
/// # #[tokio::main]
/// # async fn main() {
/// let deltas = stream::iter(vec![
///     Ok::<_, UpstreamError>("Hel".to_string()),
///     Ok(String::new()),
///     Ok("lo".to_string()),
/// ]);
/// let frames: Vec<_> = FrameEncoder::new(deltas).collect().await;
/// assert_eq!(
///     frames,
///     vec![
///         StreamFrame::Content("Hel".into()),
///         StreamFrame::Content("lo".into()),
///         StreamFrame::Done,
///     ]
/// );
/// # }
/// ```
pub struct FrameEncoder<S> {
    upstream: Option<S>,
    observer: Option<EncoderObserver>,
    emitted: String,
}

impl<S> std::fmt::Debug for FrameEncoder<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameEncoder")
            .field("finished", &self.upstream.is_none())
            .field("observed", &self.observer.is_some())
            .field("emitted_chars", &self.emitted.chars().count())
            .finish()
    }
}

impl<S> FrameEncoder<S> {
    /// Wrap an upstream delta stream.
    pub fn new(upstream: S) -> Self {
        Self {
            upstream: Some(upstream),
            observer: None,
            emitted: String::new(),
        }
    }

    /// Register a callback invoked once when the stream ends or is dropped.
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: FnOnce(EncoderOutcome, String) + Send + 'static,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    /// True once the terminal frame has been produced.
    pub fn is_finished(&self) -> bool {
        self.upstream.is_none()
    }

    fn finish(&mut self, outcome: EncoderOutcome) {
        self.upstream = None;
        if let Some(observer) = self.observer.take() {
            observer(outcome, std::mem::take(&mut self.emitted));
        }
    }
}

impl<S, E> Stream for FrameEncoder<S>
where
    S: Stream<Item = Result<String, E>> + Unpin,
    E: PublicMessage + Display,
{
    type Item = StreamFrame;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            let Some(upstream) = this.upstream.as_mut() else {
                return Poll::Ready(None);
            };

            match ready!(upstream.poll_next_unpin(cx)) {
                Some(Ok(delta)) => {
                    if delta.is_empty() {
                        continue;
                    }
                    if this.observer.is_some() {
                        this.emitted.push_str(&delta);
                    }
                    return Poll::Ready(Some(StreamFrame::Content(delta)));
                }
                Some(Err(err)) => {
                    warn!(error = %err, "Upstream failed mid-stream, emitting error frame");
                    let public = err.public_message();
                    this.finish(EncoderOutcome::Failed {
                        message: err.to_string(),
                    });
                    return Poll::Ready(Some(StreamFrame::Error(public)));
                }
                None => {
                    debug!(chars = this.emitted.chars().count(), "Upstream finished");
                    this.finish(EncoderOutcome::Completed);
                    return Poll::Ready(Some(StreamFrame::Done));
                }
            }
        }
    }
}

impl<S> Drop for FrameEncoder<S> {
    fn drop(&mut self) {
        if self.observer.is_some() {
            debug!("Encoder dropped before terminal frame");
            self.finish(EncoderOutcome::Abandoned);
        }
    }
}
