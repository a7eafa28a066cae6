//! Client-side stream lifecycle.
//!
//! ```text
//! Idle ──start──▶ Streaming ──Done──────────▶ Completed
//!                     │     ──Error/transport─▶ Failed
//!                     └─────cancel──────────▶ Cancelled
//! Completed | Failed | Cancelled ──reset──▶ Idle
//! ```

use crate::{FrameDecoder, StreamFrame};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tributary_error::{StreamError, StreamErrorKind};
use tracing::{debug, instrument, warn};

/// Lifecycle state of the current stream.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StreamState {
    /// No stream has been started, or the last one was reset
    #[default]
    Idle,
    /// Frames are being applied
    Streaming,
    /// A `Done` frame arrived; the text is final
    Completed,
    /// An `Error` frame arrived or the transport failed
    Failed,
    /// The caller cancelled the stream
    Cancelled,
}

impl StreamState {
    /// True for `Completed`, `Failed` and `Cancelled`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamState::Completed | StreamState::Failed | StreamState::Cancelled
        )
    }
}

/// Observable view of the controller.
#[derive(Debug, Clone, Default, PartialEq, Eq, derive_getters::Getters)]
pub struct StreamSnapshot {
    /// Current state
    state: StreamState,
    /// Text accumulated from `Content` frames, in order
    text: String,
    /// Failure message, set only in `Failed`
    error: Option<String>,
    /// Cause of the failure, set only in `Failed`
    failure: Option<StreamErrorKind>,
}

impl StreamSnapshot {
    fn streaming() -> Self {
        Self {
            state: StreamState::Streaming,
            ..Default::default()
        }
    }

    fn fail(&mut self, kind: StreamErrorKind) {
        self.state = StreamState::Failed;
        self.error = Some(kind.to_string());
        self.failure = Some(kind);
    }

    /// The final text, or why there is none.
    ///
    /// # Errors
    ///
    /// Returns a [`StreamError`] whose kind is the failure cause for `Failed`,
    /// `Cancelled` for `Cancelled`, and `Protocol` while no terminal state has
    /// been reached.
    #[track_caller]
    pub fn into_result(self) -> Result<String, StreamError> {
        match self.state {
            StreamState::Completed => Ok(self.text),
            StreamState::Cancelled => Err(StreamError::new(StreamErrorKind::Cancelled)),
            StreamState::Failed => {
                let kind = match self.failure {
                    Some(kind) => kind,
                    None => StreamErrorKind::Remote(self.error.unwrap_or_default()),
                };
                Err(StreamError::new(kind))
            }
            StreamState::Idle | StreamState::Streaming => Err(StreamError::new(
                StreamErrorKind::Protocol(format!("stream is {}", self.state)),
            )),
        }
    }
}

#[derive(Debug)]
struct ActiveStream {
    token: CancellationToken,
    task: JoinHandle<()>,
}

#[derive(Debug)]
struct Shared {
    snapshot: watch::Sender<StreamSnapshot>,
    // Bumped inside the watch lock whenever a new stream starts.
    generation: AtomicU64,
    active: Mutex<Option<ActiveStream>>,
}

impl Shared {
    /// Apply one frame on behalf of stream `generation`. Returns false once
    /// the reader should stop.
    fn apply(&self, generation: u64, frame: StreamFrame) -> bool {
        let mut keep_reading = false;
        self.snapshot.send_if_modified(|snapshot| {
            if self.generation.load(Ordering::SeqCst) != generation
                || snapshot.state != StreamState::Streaming
            {
                return false;
            }
            match frame {
                StreamFrame::Content(text) => {
                    snapshot.text.push_str(&text);
                    keep_reading = true;
                }
                StreamFrame::Done => snapshot.state = StreamState::Completed,
                StreamFrame::Error(message) => snapshot.fail(StreamErrorKind::Remote(message)),
            }
            true
        });
        keep_reading
    }

    /// Fail stream `generation` because its transport broke.
    fn fail(&self, generation: u64, err: StreamError) {
        self.snapshot.send_if_modified(|snapshot| {
            if self.generation.load(Ordering::SeqCst) != generation
                || snapshot.state != StreamState::Streaming
            {
                return false;
            }
            snapshot.fail(err.kind);
            true
        });
    }

    fn cancel_active(&self) {
        if let Some(active) = self.active.lock().take() {
            active.token.cancel();
            active.task.abort();
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(active) = self.active.get_mut().take() {
            active.token.cancel();
            active.task.abort();
        }
    }
}

/// Owns the lifecycle of at most one active completion stream.
///
/// State is published through a [`watch`] channel, so any number of
/// observers can [`subscribe`](Self::subscribe). Each stream is read by one
/// Tokio task; [`cancel`](Self::cancel) aborts its pending read at once and
/// frames already buffered are not applied. Starting a new stream cancels the
/// previous one, and a superseded reader can never modify state again.
///
/// Clones share the same stream.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use futures::stream;
/// use tributary_stream::{StreamController, StreamState};
///
/// # #[tokio::main]
/// # async fn main() {
/// let controller = StreamController::new();
/// let body = stream::iter(vec![
///     Ok::<_, std::io::Error>(Bytes::from("data: {\"content\":\"Hi\"}\n\n")),
///     Ok(Bytes::from("data: {\"done\":true}\n\n")),
/// ]);
///
/// controller.start_stream(body);
/// let done = controller.wait_terminal().await;
/// assert_eq!(*done.state(), StreamState::Completed);
/// assert_eq!(done.text(), "Hi");
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct StreamController {
    shared: Arc<Shared>,
}

impl Default for StreamController {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamController {
    /// Create an idle controller.
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(StreamSnapshot::default());
        Self {
            shared: Arc::new(Shared {
                snapshot,
                generation: AtomicU64::new(0),
                active: Mutex::new(None),
            }),
        }
    }

    /// Current state, text and error.
    pub fn snapshot(&self) -> StreamSnapshot {
        self.shared.snapshot.borrow().clone()
    }

    /// Current state.
    pub fn state(&self) -> StreamState {
        self.shared.snapshot.borrow().state
    }

    /// Receiver notified on every state or text change.
    pub fn subscribe(&self) -> watch::Receiver<StreamSnapshot> {
        self.shared.snapshot.subscribe()
    }

    /// Begin reading a transport byte stream.
    ///
    /// Any stream still running is cancelled first. Text and error are
    /// cleared and the state becomes `Streaming`. Must be called from within
    /// a Tokio runtime.
    #[instrument(skip_all)]
    pub fn start_stream<S, E>(&self, body: S)
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        self.shared.cancel_active();

        let mut generation = 0;
        self.shared.snapshot.send_modify(|snapshot| {
            generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *snapshot = StreamSnapshot::streaming();
        });
        debug!(generation, "Stream started");

        let token = CancellationToken::new();
        let task = tokio::spawn(read_frames(
            Arc::downgrade(&self.shared),
            generation,
            token.clone(),
            body,
        ));
        *self.shared.active.lock() = Some(ActiveStream { token, task });
    }

    /// Cancel the running stream.
    ///
    /// Returns true if a stream was streaming. The state is `Cancelled` when
    /// this returns; no later frame is applied.
    #[instrument(skip(self))]
    pub fn cancel(&self) -> bool {
        let cancelled = self.shared.snapshot.send_if_modified(|snapshot| {
            if snapshot.state != StreamState::Streaming {
                return false;
            }
            snapshot.state = StreamState::Cancelled;
            true
        });
        self.shared.cancel_active();
        if cancelled {
            debug!("Stream cancelled");
        }
        cancelled
    }

    /// Return to `Idle`, clearing text and error.
    ///
    /// A running stream is cancelled first.
    pub fn reset(&self) {
        self.cancel();
        self.shared.snapshot.send_if_modified(|snapshot| {
            if *snapshot == StreamSnapshot::default() {
                return false;
            }
            *snapshot = StreamSnapshot::default();
            true
        });
    }

    /// Wait for the terminal state and return the final text.
    ///
    /// # Errors
    ///
    /// As [`StreamSnapshot::into_result`].
    pub async fn outcome(&self) -> Result<String, StreamError> {
        self.wait_terminal().await.into_result()
    }

    /// Wait until the state is terminal and return that snapshot.
    ///
    /// Returns immediately when already terminal. Waits indefinitely while
    /// `Idle`.
    pub async fn wait_terminal(&self) -> StreamSnapshot {
        let mut receiver = self.subscribe();
        match receiver.wait_for(|snapshot| snapshot.state.is_terminal()).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        }
    }
}

async fn read_frames<S, E>(
    shared: Weak<Shared>,
    generation: u64,
    token: CancellationToken,
    body: S,
) where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let mut body = Box::pin(body);
    let mut decoder = FrameDecoder::new();

    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => return,
            next = body.next() => next,
        };

        let exhausted = next.is_none();
        let frames = match next {
            Some(Ok(chunk)) => decoder.feed(&chunk),
            Some(Err(err)) => {
                let err = StreamError::new(StreamErrorKind::Transport(err.to_string()));
                warn!(error = %err, "Transport failed mid-stream");
                if !token.is_cancelled() {
                    if let Some(shared) = shared.upgrade() {
                        shared.fail(generation, err);
                    }
                }
                return;
            }
            None => decoder.finish(),
        };
        for frame in frames {
            if token.is_cancelled() {
                return;
            }
            let Some(shared) = shared.upgrade() else {
                return;
            };
            if !shared.apply(generation, frame) {
                return;
            }
        }

        if exhausted {
            return;
        }
    }
}
