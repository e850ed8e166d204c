//! Closure-driven next links and recording delays for policy tests.

use crate::config::DelayFunction;
use crate::error::PipelineError;
use crate::policy::Policy;
use crate::request::HttpRequest;
use crate::response::HttpResponse;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Handler = dyn Fn(&HttpRequest, usize) -> Result<HttpResponse, PipelineError> + Send + Sync;

/// Next link that answers through a closure and records every request it sees.
///
/// The closure receives the request and the zero-based call index.
pub(super) struct StubPolicy {
    handler: Box<Handler>,
    calls: Mutex<Vec<HttpRequest>>,
}

impl StubPolicy {
    pub(super) fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&HttpRequest, usize) -> Result<HttpResponse, PipelineError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub(super) fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub(super) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Policy for StubPolicy {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, PipelineError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(request.clone());
            calls.len() - 1
        };
        (self.handler)(&request, index)
    }
}

/// Delay function that returns immediately and records what it was asked for.
pub(super) fn recording_delay() -> (DelayFunction, Arc<Mutex<Vec<Duration>>>) {
    let slept = Arc::new(Mutex::new(Vec::new()));
    let recorded = slept.clone();
    let delay: DelayFunction = Arc::new(move |duration| {
        recorded.lock().unwrap().push(duration);
        Box::pin(async {})
    });
    (delay, slept)
}
