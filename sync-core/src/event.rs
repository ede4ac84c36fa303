//! Pre-flight announcement of a transaction.
//!
//! Before a request is issued, a [`SyncEvent`] describing it is offered to
//! every hook, and any hook may answer [`Veto::Abort`]. Once the transaction
//! settles, the event's status side channel records how it ended.

use changeq_sync_types::{Method, TransactionOutcome, STATUS_SUCCESS};

use crate::request::SyncOptions;

/// A hook's answer to a pre-flight announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Veto {
    /// Let the transaction proceed.
    #[default]
    Continue,
    /// Cancel the transaction before any request is issued.
    Abort,
}

impl Veto {
    /// Combine two answers; any abort wins.
    pub fn and(self, other: Veto) -> Veto {
        match (self, other) {
            (Veto::Continue, Veto::Continue) => Veto::Continue,
            _ => Veto::Abort,
        }
    }

    /// Whether this answer cancels the transaction.
    pub fn is_abort(self) -> bool {
        self == Veto::Abort
    }
}

/// Description of one transaction, shared with hooks.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncEvent {
    /// Logical operation.
    pub method: Method,
    /// Resolved URL.
    pub url: String,
    /// Options the transaction was called with.
    pub options: SyncOptions,
    status: Option<String>,
}

impl SyncEvent {
    /// Announce `method` on `url`.
    pub fn new(method: Method, url: impl Into<String>, options: SyncOptions) -> Self {
        Self {
            method,
            url: url.into(),
            options,
            status: None,
        }
    }

    /// How the transaction ended, once settled.
    ///
    /// `"success"` on success, otherwise the trimmed failure status.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Record the settlement of the transaction.
    pub fn settle(&mut self, outcome: &TransactionOutcome) {
        let status = match outcome {
            Ok(_) => STATUS_SUCCESS.to_string(),
            Err(failure) => failure.status.as_str().trim().to_string(),
        };
        self.status = Some(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use changeq_sync_types::{StatusText, SyncFailure, SyncSuccess};

    #[test]
    fn any_abort_wins() {
        assert_eq!(Veto::Continue.and(Veto::Continue), Veto::Continue);
        assert_eq!(Veto::Continue.and(Veto::Abort), Veto::Abort);
        assert_eq!(Veto::Abort.and(Veto::Continue), Veto::Abort);
        assert!(Veto::default() == Veto::Continue);
    }

    #[test]
    fn status_unset_until_settled() {
        let mut event = SyncEvent::new(Method::Read, "/photos", SyncOptions::new());
        assert_eq!(event.status(), None);

        event.settle(&Ok(SyncSuccess::no_op()));
        assert_eq!(event.status(), Some("success"));
    }

    #[test]
    fn failed_settlement_records_status_text() {
        let mut event = SyncEvent::new(Method::Update, "/photos", SyncOptions::new());
        event.settle(&Err(SyncFailure::new(StatusText::Timeout, "slow")));
        assert_eq!(event.status(), Some("timeout"));
    }
}
