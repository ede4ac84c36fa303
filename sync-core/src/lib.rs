//! # sync-core
//!
//! Pure logic for changeq (no I/O, instant tests).
//!
//! This crate implements the state machines and data structures for the
//! transaction and change-queue layers without any network or timer I/O,
//! enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about state transitions
//!
//! The actual I/O (network, timers, signal delivery) is performed by
//! `sync-client`, which interprets the actions produced by these state
//! machines.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod changelog;
pub mod event;
pub mod request;
pub mod sparse;
pub mod state;
pub mod target;

pub use changelog::ChangeLog;
pub use event::{SyncEvent, Veto};
pub use request::{RequestExtra, SyncOptions, TransactionRequest};
pub use sparse::{SparseError, SparseList};
pub use state::{FlushAction, FlushEvent, FlushState};
pub use target::{StaticTarget, SyncTarget};
