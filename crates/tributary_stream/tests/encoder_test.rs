use futures::{StreamExt, stream};
use std::sync::{Arc, Mutex};
use tokio_stream::wrappers::ReceiverStream;
use tributary_error::{PublicMessage, UpstreamError};
use tributary_stream::{EncoderOutcome, FrameEncoder, StreamFrame};

type Captured = Arc<Mutex<Option<(EncoderOutcome, String)>>>;

fn capture() -> (Captured, impl FnOnce(EncoderOutcome, String) + Send + 'static) {
    let slot: Captured = Arc::new(Mutex::new(None));
    let writer = Arc::clone(&slot);
    (slot, move |outcome, text| {
        *writer.lock().unwrap() = Some((outcome, text));
    })
}

#[tokio::test]
async fn deltas_become_content_frames_then_done() {
    let (slot, observer) = capture();
    let deltas = stream::iter(vec![
        Ok::<_, UpstreamError>("Hel".to_string()),
        Ok(String::new()),
        Ok("lo".to_string()),
    ]);

    let frames: Vec<_> = FrameEncoder::new(deltas)
        .with_observer(observer)
        .collect()
        .await;

    assert_eq!(
        frames,
        vec![
            StreamFrame::Content("Hel".into()),
            StreamFrame::Content("lo".into()),
            StreamFrame::Done,
        ]
    );
    assert_eq!(
        slot.lock().unwrap().clone(),
        Some((EncoderOutcome::Completed, "Hello".to_string()))
    );
}

#[tokio::test]
async fn upstream_error_becomes_one_sanitized_error_frame() {
    let (slot, observer) = capture();
    let failure = UpstreamError::from_status(500, "internal trace for key sk-secret");
    let public = failure.public_message();
    let deltas = stream::iter(vec![
        Ok("partial".to_string()),
        Err(failure),
        Ok("never".to_string()),
    ]);

    let frames: Vec<_> = FrameEncoder::new(deltas)
        .with_observer(observer)
        .collect()
        .await;

    assert_eq!(
        frames,
        vec![
            StreamFrame::Content("partial".into()),
            StreamFrame::Error(public.clone()),
        ]
    );
    assert!(!public.contains("sk-secret"));

    let (outcome, text) = slot.lock().unwrap().clone().expect("observer called");
    assert!(matches!(outcome, EncoderOutcome::Failed { message } if message.contains("sk-secret")));
    assert_eq!(text, "partial");
}

#[tokio::test]
async fn upstream_is_released_after_terminal_frame() {
    let (tx, rx) = tokio::sync::mpsc::channel::<Result<String, UpstreamError>>(4);
    let mut encoder = FrameEncoder::new(ReceiverStream::new(rx));

    tx.send(Ok("a".into())).await.unwrap();
    assert_eq!(encoder.next().await, Some(StreamFrame::Content("a".into())));
    assert!(!tx.is_closed());

    tx.send(Err(UpstreamError::network("reset by peer"))).await.unwrap();
    assert!(matches!(encoder.next().await, Some(StreamFrame::Error(_))));
    assert!(encoder.is_finished());
    assert!(tx.is_closed());
    assert_eq!(encoder.next().await, None);
}

#[tokio::test]
async fn dropping_before_terminal_reports_abandoned() {
    let (slot, observer) = capture();
    let (tx, rx) = tokio::sync::mpsc::channel::<Result<String, UpstreamError>>(4);
    let mut encoder = FrameEncoder::new(ReceiverStream::new(rx)).with_observer(observer);

    tx.send(Ok("Hel".into())).await.unwrap();
    assert_eq!(encoder.next().await, Some(StreamFrame::Content("Hel".into())));
    drop(encoder);

    assert!(tx.is_closed());
    assert_eq!(
        slot.lock().unwrap().clone(),
        Some((EncoderOutcome::Abandoned, "Hel".to_string()))
    );
}

#[tokio::test]
async fn observer_runs_once() {
    let calls = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&calls);
    let deltas = stream::iter(vec![Ok::<_, UpstreamError>("x".to_string())]);

    let mut encoder = FrameEncoder::new(deltas).with_observer(move |_, _| {
        *counter.lock().unwrap() += 1;
    });
    while encoder.next().await.is_some() {}
    drop(encoder);

    assert_eq!(*calls.lock().unwrap(), 1);
}
