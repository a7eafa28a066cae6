//! Test utilities for provider tests.

use async_trait::async_trait;
use futures::stream;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tributary_error::UpstreamError;
use tributary_models::{CompletionCall, CompletionProvider, ProviderStream};

/// Provider that replays a fixed script of outcomes, one per call.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<Vec<String>, UpstreamError>>>,
    calls: AtomicUsize,
    last_call: Mutex<Option<CompletionCall>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<Vec<&str>, UpstreamError>>) -> Self {
        let script = script
            .into_iter()
            .map(|step| step.map(|deltas| deltas.into_iter().map(String::from).collect()))
            .collect();
        Self {
            script: Mutex::new(script),
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_call(&self) -> Option<CompletionCall> {
        self.last_call.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn provider_name(&self) -> &'static str {
        "scripted"
    }

    async fn open_stream(&self, call: &CompletionCall) -> Result<ProviderStream, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_call.lock().unwrap() = Some(call.clone());

        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(UpstreamError::network("script exhausted")));
        let deltas = step?;
        Ok(Box::pin(stream::iter(deltas.into_iter().map(Ok))))
    }
}
