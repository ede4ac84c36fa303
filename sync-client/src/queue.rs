//! Change queue - ordered delivery of structural mutations.
//!
//! A [`ChangeQueue`] owns the [`ChangeLog`] of one collection and flushes it
//! to the collection URL as a single `update` transaction:
//!
//! ```text
//! record() ─▶ log ─▶ flush(): snapshot ─▶ PUT {"changes": [...]}
//!                              │
//!                 success ─────┼──── failure
//!                    │                  │
//!            ack, Synced,         requeue at head,
//!          loop if backlog        SyncFailed, stop
//! ```
//!
//! At most one flush is in flight per queue. The decisions are made by
//! [`FlushState`]; this module executes the resulting actions.

use changeq_sync_core::{
    ChangeLog, FlushAction, FlushEvent, FlushState, StaticTarget,
};
use changeq_sync_types::{
    ChangeBatch, ChangeRecord, Method, StatusText, SyncFailure, TransactionOutcome,
};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::QueueConfig;
use crate::emitter::{EventEmitter, ListenerId};
use crate::syncer::Syncer;
use crate::transport::HttpTransport;

/// Requirements on item identifiers carried by change records.
pub trait ItemId: Clone + Serialize + PartialEq + fmt::Debug + Send + Sync + 'static {}

impl<T> ItemId for T where T: Clone + Serialize + PartialEq + fmt::Debug + Send + Sync + 'static {}

/// Signals emitted by a [`ChangeQueue`].
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent<Id> {
    /// A record was appended.
    Changed {
        /// Queued records after the append.
        len: usize,
    },
    /// A batch was accepted by the server.
    Synced {
        /// The records that were sent.
        records: Vec<ChangeRecord<Id>>,
    },
    /// A batch failed and was put back at the head of the log.
    SyncFailed {
        /// The records that were sent.
        records: Vec<ChangeRecord<Id>>,
        /// Why the batch failed.
        failure: SyncFailure,
    },
}

/// What a call to [`ChangeQueue::flush`] delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushSummary {
    /// Batches accepted by the server.
    pub batches: usize,
    /// Records in those batches.
    pub records: usize,
}

#[derive(Debug)]
struct QueueState<Id> {
    log: ChangeLog<Id>,
    flush: FlushState,
}

impl<Id: Clone> QueueState<Id> {
    /// Feed `event` to the state machine and run the log-side actions.
    ///
    /// Returns the actions so the caller can perform the signal-side ones
    /// after the lock is released.
    fn advance(&mut self, event: FlushEvent) -> (Vec<FlushAction>, Option<Vec<ChangeRecord<Id>>>) {
        let (next, actions) = self.flush.on_event(event);
        self.flush = next;

        let mut snapshot = None;
        for action in &actions {
            match action {
                FlushAction::TakeSnapshot => snapshot = self.log.take_snapshot(),
                FlushAction::AckSnapshot => snapshot = self.log.ack(),
                FlushAction::RequeueSnapshot => {
                    self.log.requeue();
                }
                FlushAction::SendBatch
                | FlushAction::EmitSynced
                | FlushAction::EmitFailed
                | FlushAction::ScheduleFlush => {}
            }
        }
        (actions, snapshot)
    }
}

/// Requeues the in-flight batch if a flush future is dropped mid-send.
struct InFlightGuard<'a, Id: Clone> {
    state: &'a Mutex<QueueState<Id>>,
    armed: bool,
}

impl<'a, Id: Clone> InFlightGuard<'a, Id> {
    fn new(state: &'a Mutex<QueueState<Id>>) -> Self {
        Self { state, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<Id: Clone> Drop for InFlightGuard<'_, Id> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.state.lock();
            state.advance(FlushEvent::FlushFailed);
            tracing::debug!("flush cancelled, {} record(s) requeued", state.log.len());
        }
    }
}

struct QueueInner<Id, T: HttpTransport> {
    syncer: Arc<Syncer<T>>,
    url: String,
    config: QueueConfig,
    state: Mutex<QueueState<Id>>,
    events: EventEmitter<QueueEvent<Id>>,
    discarded: AtomicBool,
}

/// Ordered, batched delivery of change records to one collection URL.
///
/// Clones share the same log.
pub struct ChangeQueue<Id, T: HttpTransport> {
    inner: Arc<QueueInner<Id, T>>,
}

impl<Id, T: HttpTransport> Clone for ChangeQueue<Id, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<Id, T: HttpTransport> fmt::Debug for ChangeQueue<Id, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeQueue")
            .field("url", &self.inner.url)
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl<Id: ItemId, T: HttpTransport + 'static> ChangeQueue<Id, T> {
    /// An empty queue that flushes to `url` through `syncer`.
    pub fn new(syncer: Arc<Syncer<T>>, url: impl Into<String>, config: QueueConfig) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                syncer,
                url: url.into(),
                config,
                state: Mutex::new(QueueState {
                    log: ChangeLog::new(),
                    flush: FlushState::new(),
                }),
                events: EventEmitter::new(),
                discarded: AtomicBool::new(false),
            }),
        }
    }

    /// URL batches are sent to.
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Queue configuration.
    pub fn config(&self) -> &QueueConfig {
        &self.inner.config
    }

    /// The syncer batches are sent through.
    pub fn syncer(&self) -> &Arc<Syncer<T>> {
        &self.inner.syncer
    }

    /// Append `record` and, with `auto_sync`, start a flush.
    ///
    /// Records appended after [`discard`](Self::discard) are dropped.
    pub fn record(&self, record: ChangeRecord<Id>) {
        if self.is_discarded() {
            tracing::debug!("record for discarded queue {} dropped", self.inner.url);
            return;
        }

        let len = {
            let mut state = self.inner.state.lock();
            state.log.append(record);
            state.log.len()
        };
        self.inner.events.emit(&QueueEvent::Changed { len });

        if self.inner.config.auto_sync {
            self.spawn_flush();
        }
    }

    /// Start a flush on the current tokio runtime without waiting for it.
    ///
    /// Outside a runtime the records stay queued for the next explicit
    /// [`flush`](Self::flush).
    pub fn spawn_flush(&self) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let queue = self.clone();
                handle.spawn(async move {
                    // Failures are already reported through SyncFailed.
                    let _ = queue.flush().await;
                });
            }
            Err(_) => tracing::debug!("no runtime, flush of {} deferred", self.inner.url),
        }
    }

    /// Send queued records until the log is drained or a batch fails.
    ///
    /// Returns immediately with an empty summary when the log is empty or a
    /// flush is already in flight. Dropping the future before the batch
    /// settles puts the batch back at the head of the log.
    ///
    /// # Errors
    ///
    /// Returns the failure of the batch that stopped the flush. Its records
    /// are back at the head of the log.
    pub async fn flush(&self) -> Result<FlushSummary, SyncFailure> {
        let mut summary = FlushSummary::default();

        loop {
            let snapshot = {
                let mut state = self.inner.state.lock();
                let queued = state.log.len();
                let (_, snapshot) = state.advance(FlushEvent::FlushRequested { queued });
                snapshot
            };
            let Some(records) = snapshot else {
                return Ok(summary);
            };

            tracing::debug!(
                "flushing {} record(s) to {}",
                records.len(),
                self.inner.url
            );
            let guard = InFlightGuard::new(&self.inner.state);
            let outcome = self.send_batch(&records).await;
            guard.disarm();

            if self.is_discarded() {
                self.inner.state.lock().flush = FlushState::Idle;
                tracing::debug!("queue {} discarded mid-flush", self.inner.url);
                return outcome.map(|_| summary);
            }

            let (actions, backlog) = {
                let mut state = self.inner.state.lock();
                let event = match &outcome {
                    Ok(_) => FlushEvent::FlushSucceeded {
                        backlog: state.log.len(),
                    },
                    Err(_) => FlushEvent::FlushFailed,
                };
                let (actions, _) = state.advance(event);
                (actions, state.log.len())
            };

            let mut again = false;
            for action in actions {
                match action {
                    FlushAction::EmitSynced => self.inner.events.emit(&QueueEvent::Synced {
                        records: records.clone(),
                    }),
                    FlushAction::EmitFailed => {
                        if let Err(failure) = &outcome {
                            self.inner.events.emit(&QueueEvent::SyncFailed {
                                records: records.clone(),
                                failure: failure.clone(),
                            });
                        }
                    }
                    FlushAction::ScheduleFlush => again = true,
                    _ => {}
                }
            }

            match outcome {
                Ok(_) => {
                    summary.batches += 1;
                    summary.records += records.len();
                    tracing::info!(
                        "synced {} record(s) to {}, {} pending",
                        records.len(),
                        self.inner.url,
                        backlog
                    );
                    if !again {
                        return Ok(summary);
                    }
                }
                Err(failure) => {
                    tracing::warn!(
                        "flush to {} failed, {} record(s) requeued: {}",
                        self.inner.url,
                        records.len(),
                        failure
                    );
                    return Err(failure);
                }
            }
        }
    }

    async fn send_batch(&self, records: &[ChangeRecord<Id>]) -> TransactionOutcome {
        let body = ChangeBatch::new(records.to_vec())
            .to_value()
            .map_err(|e| SyncFailure::new(StatusText::Error, e.to_string()))?;
        let target = StaticTarget::new(self.inner.url.clone());
        let options = self.inner.config.sync_options().with_body(body);
        self.inner.syncer.sync(Method::Update, &target, options).await
    }

    /// Drop every pending record and listener without flushing.
    ///
    /// A flush already in flight is neither awaited nor cancelled; its
    /// outcome is ignored.
    pub fn discard(&self) {
        self.inner.discarded.store(true, Ordering::SeqCst);
        self.inner.state.lock().log.clear();
        self.inner.events.clear();
    }

    /// Whether [`discard`](Self::discard) was called.
    pub fn is_discarded(&self) -> bool {
        self.inner.discarded.load(Ordering::SeqCst)
    }

    /// Queued records, head first (excludes an in-flight batch).
    pub fn records(&self) -> Vec<ChangeRecord<Id>> {
        self.inner.state.lock().log.records()
    }

    /// Number of queued records.
    pub fn len(&self) -> usize {
        self.inner.state.lock().log.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of records in the batch in flight.
    pub fn in_flight(&self) -> usize {
        self.inner.state.lock().log.in_flight_count()
    }

    /// Whether a flush is in flight.
    pub fn is_flushing(&self) -> bool {
        self.inner.state.lock().flush.is_flushing()
    }

    /// Listen to queue signals.
    pub fn on(&self, listener: impl Fn(&QueueEvent<Id>) + Send + Sync + 'static) -> ListenerId {
        self.inner.events.on(listener)
    }

    /// Stop listening.
    pub fn off(&self, id: ListenerId) -> bool {
        self.inner.events.off(id)
    }
}
