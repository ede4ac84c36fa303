//! Flush state machine for a change queue.
//!
//! This module provides a pure, side-effect-free state machine for the
//! lifecycle of a queue flush. The state machine takes events as input and
//! produces a new state plus a list of actions to execute.
//!
//! The actual I/O (sending the batch, emitting signals) is performed by
//! sync-client, not by this module. This enables instant unit testing without
//! network mocks.
//!
//! ```text
//!            FlushRequested{queued > 0}
//!   Idle ───────────────────────────────▶ Flushing
//!    ▲                                       │
//!    └──── FlushSucceeded / FlushFailed ─────┘
//! ```

/// Flush state machine - NO I/O, just state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushState {
    /// No flush in flight.
    #[default]
    Idle,
    /// One flush in flight.
    Flushing {
        /// Number of records in the in-flight snapshot.
        records: usize,
    },
}

impl FlushState {
    /// Create a new state machine in the Idle state.
    pub fn new() -> Self {
        Self::Idle
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// This is a pure function - no side effects. The caller (sync-client)
    /// is responsible for executing the returned actions in order.
    pub fn on_event(self, event: FlushEvent) -> (Self, Vec<FlushAction>) {
        match (self, event) {
            // From Idle
            (Self::Idle, FlushEvent::FlushRequested { queued }) if queued > 0 => (
                Self::Flushing { records: queued },
                vec![FlushAction::TakeSnapshot, FlushAction::SendBatch],
            ),

            // From Flushing
            (Self::Flushing { .. }, FlushEvent::FlushSucceeded { backlog }) => {
                let mut actions = vec![FlushAction::AckSnapshot, FlushAction::EmitSynced];
                if backlog > 0 {
                    actions.push(FlushAction::ScheduleFlush);
                }
                (Self::Idle, actions)
            }
            (Self::Flushing { .. }, FlushEvent::FlushFailed) => (
                Self::Idle,
                vec![FlushAction::RequeueSnapshot, FlushAction::EmitFailed],
            ),

            // Empty log, a flush already in flight, or a stray completion
            (state, _) => (state, vec![]),
        }
    }

    /// Check if a flush is in flight.
    pub fn is_flushing(&self) -> bool {
        matches!(self, Self::Flushing { .. })
    }
}

/// Events that can occur in the flush lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushEvent {
    /// A flush was requested, by a mutation or explicitly.
    FlushRequested {
        /// Number of records currently queued.
        queued: usize,
    },
    /// The in-flight batch was accepted by the server.
    FlushSucceeded {
        /// Number of records appended while the batch was in flight.
        backlog: usize,
    },
    /// The in-flight batch failed.
    FlushFailed,
}

/// Actions to be executed by the sync-client.
///
/// These are instructions, not side effects. The sync-client interprets
/// these and performs the actual I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushAction {
    /// Move every queued record into the in-flight snapshot.
    TakeSnapshot,
    /// Send the snapshot as one `update` transaction.
    SendBatch,
    /// Drop the in-flight snapshot.
    AckSnapshot,
    /// Put the in-flight snapshot back at the head of the log.
    RequeueSnapshot,
    /// Signal that the snapshot was synced.
    EmitSynced,
    /// Signal that the snapshot failed to sync.
    EmitFailed,
    /// Start another flush for records that arrived mid-flight.
    ScheduleFlush,
}
