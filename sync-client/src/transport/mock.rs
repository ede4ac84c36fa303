//! Mock transport for testing.
//!
//! Allows queueing responses, forcing failures, simulating latency and
//! capturing sent requests for verification.

use super::{HttpRequest, HttpResponse, HttpTransport, TransportError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Mock transport for testing.
///
/// When no response is queued, requests succeed with `200 OK` and an empty
/// body. Clones share state, so a test can keep a handle after moving the
/// transport into a syncer.
#[derive(Debug, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    sent_requests: Vec<HttpRequest>,
    response_queue: VecDeque<Result<HttpResponse, TransportError>>,
    fail_next: Option<TransportError>,
    latency: Option<Duration>,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response to be returned by the next `send()` call.
    pub fn queue_response(&self, response: HttpResponse) {
        self.inner.lock().response_queue.push_back(Ok(response));
    }

    /// Queue a JSON response.
    pub fn queue_json(&self, status: u16, value: serde_json::Value) {
        self.queue_response(HttpResponse::json(status, &value));
    }

    /// Queue a transport error to be returned in sequence with responses.
    pub fn queue_error(&self, error: TransportError) {
        self.inner.lock().response_queue.push_back(Err(error));
    }

    /// Cause the next `send()` to fail with the given error, ahead of the queue.
    pub fn fail_next(&self, error: TransportError) {
        self.inner.lock().fail_next = Some(error);
    }

    /// Delay every response by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.inner.lock().latency = Some(latency);
    }

    /// Get all requests that were sent.
    pub fn sent_requests(&self) -> Vec<HttpRequest> {
        self.inner.lock().sent_requests.clone()
    }

    /// Get the last request that was sent.
    pub fn last_sent(&self) -> Option<HttpRequest> {
        self.inner.lock().sent_requests.last().cloned()
    }

    /// Number of requests sent so far.
    pub fn request_count(&self) -> usize {
        self.inner.lock().sent_requests.len()
    }

    /// Clear all state (requests, queue, failures, latency).
    pub fn reset(&self) {
        *self.inner.lock() = MockTransportInner::default();
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let (result, latency) = {
            let mut inner = self.inner.lock();
            inner.sent_requests.push(request);

            let result = match inner.fail_next.take() {
                Some(error) => Err(error),
                None => inner
                    .response_queue
                    .pop_front()
                    .unwrap_or_else(|| Ok(HttpResponse::ok())),
            };
            (result, inner.latency)
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        result
    }
}
