//! Syncer - the transaction layer.
//!
//! [`Syncer::sync`] maps one logical operation on a [`SyncTarget`] to at most
//! one HTTP request:
//!
//! ```text
//! build request → hooks.before (veto?) → delete-new short-circuit
//!     → transport.send → classify → delay until start + delay
//!     → event.settle → hooks.after
//! ```
//!
//! The syncer keeps no state between calls apart from its hook list and
//! never retries.

use changeq_sync_core::{SyncEvent, SyncOptions, SyncTarget, TransactionRequest, Veto};
use changeq_sync_types::{
    Method, StatusText, SyncFailure, SyncSuccess, TransactionOutcome, STATUS_SUCCESS,
};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::time::Instant;

use crate::hook::SyncHook;
use crate::transport::{HttpResponse, HttpTransport};

/// A settled transaction and the event it was announced with.
#[derive(Debug, Clone)]
pub struct Settled {
    /// The announced event, with its status side channel set.
    pub event: SyncEvent,
    /// How the transaction ended.
    pub outcome: TransactionOutcome,
}

/// Issues transactions through an injected transport.
pub struct Syncer<T: HttpTransport> {
    transport: T,
    hooks: RwLock<Vec<Arc<dyn SyncHook>>>,
}

impl<T: HttpTransport> Syncer<T> {
    /// Create a syncer over `transport`.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            hooks: RwLock::new(Vec::new()),
        }
    }

    /// Register a hook. Hooks run in registration order.
    pub fn add_hook(&self, hook: Arc<dyn SyncHook>) {
        self.hooks.write().push(hook);
    }

    /// Remove every hook.
    pub fn clear_hooks(&self) {
        self.hooks.write().clear();
    }

    /// Get a reference to the underlying transport (for testing).
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run `method` on `target` and wait for it to settle.
    pub async fn sync<S: SyncTarget + ?Sized>(
        &self,
        method: Method,
        target: &S,
        options: SyncOptions,
    ) -> TransactionOutcome {
        self.transact(method, target, options).await.outcome
    }

    /// Like [`sync`](Self::sync), also returning the settled event.
    pub async fn transact<S: SyncTarget + ?Sized>(
        &self,
        method: Method,
        target: &S,
        options: SyncOptions,
    ) -> Settled {
        let start = Instant::now();

        let request = match TransactionRequest::build(method, target, &options) {
            Ok(request) => request,
            Err(e) => {
                let url = options.url.clone().unwrap_or_else(|| target.url());
                let event = SyncEvent::new(method, url, options);
                let failure = SyncFailure::new(StatusText::Error, e.to_string());
                return self.finish(event, Err(failure)).await;
            }
        };
        let event = SyncEvent::new(method, request.url.clone(), options);

        if self.announce(&event).await.is_abort() {
            tracing::debug!("{} {} vetoed by hook", method, event.url);
            return self.finish(event, Err(SyncFailure::aborted())).await;
        }

        if method == Method::Delete && target.is_new() {
            tracing::debug!("delete of unsaved target {} skipped", event.url);
            return self.finish(event, Ok(SyncSuccess::no_op())).await;
        }

        tracing::debug!("{} {} ({})", request.verb, request.url, method);
        let outcome = match self.transport.send((&request).into()).await {
            Ok(response) => classify(response),
            Err(e) => Err(e.into_failure()),
        };

        if let Some(delay) = request.delay {
            tokio::time::sleep_until(start + delay).await;
        }

        self.finish(event, outcome).await
    }

    async fn announce(&self, event: &SyncEvent) -> Veto {
        let hooks = self.hooks.read().clone();
        let mut verdict = Veto::Continue;
        for hook in hooks {
            verdict = verdict.and(hook.before(event).await);
        }
        verdict
    }

    async fn finish(&self, mut event: SyncEvent, outcome: TransactionOutcome) -> Settled {
        event.settle(&outcome);
        match &outcome {
            Ok(_) => tracing::debug!("{} {} settled: success", event.method, event.url),
            Err(failure) => tracing::warn!(
                "{} {} failed: {}",
                event.method,
                event.url,
                failure
            ),
        }

        let hooks = self.hooks.read().clone();
        for hook in hooks {
            hook.after(&event, &outcome).await;
        }
        Settled { event, outcome }
    }
}

/// Turn a raw response into an outcome.
fn classify(response: HttpResponse) -> TransactionOutcome {
    let meta = response.meta();
    if !response.is_success() {
        let message = format!("{} {}", response.status, response.status_text)
            .trim()
            .to_string();
        return Err(SyncFailure::new(StatusText::Error, message).with_meta(meta));
    }

    let data = if response.body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        match serde_json::from_slice(&response.body) {
            Ok(value) => Some(value),
            Err(e) => {
                return Err(SyncFailure::new(StatusText::ParserError, e.to_string()).with_meta(meta))
            }
        }
    };

    let status_text = if response.status_text.is_empty() {
        STATUS_SUCCESS.to_string()
    } else {
        response.status_text
    };
    Ok(SyncSuccess {
        data,
        status_text,
        meta: Some(meta),
    })
}
