//! # sync-types
//!
//! Wire format types for the changeq transaction and change-queue engine.
//!
//! This crate provides the foundational types used across all changeq crates:
//! - [`Method`], [`Verb`] - Logical operations and the HTTP verbs they map to
//! - [`ChangeRecord`], [`ChangeBatch`] - Collection mutations and the flush body
//! - [`SyncSuccess`], [`SyncFailure`], [`StatusText`] - Transaction outcomes
//! - [`PageResponse`] - Sparse page-fetch responses
//! - [`SyncError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod changes;
mod error;
mod method;
mod outcome;
mod page;

pub use changes::{ChangeAction, ChangeBatch, ChangeRecord};
pub use error::SyncError;
pub use method::{Method, Verb};
pub use outcome::{
    ResponseMeta, StatusText, SyncFailure, SyncSuccess, TransactionOutcome, STATUS_SUCCESS,
};
pub use page::{PageResponse, DEFAULT_IDS_KEY, DEFAULT_TOTAL_KEY};

/// Content type used for JSON request bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json";
