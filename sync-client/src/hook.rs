//! Two-phase transaction hooks.
//!
//! A [`SyncHook`] sees every transaction twice: once before any request is
//! issued, where it may veto, and once after settlement.

use async_trait::async_trait;
use changeq_sync_core::{SyncEvent, Veto};
use changeq_sync_types::TransactionOutcome;

/// Observer of transactions, with the power to cancel them before issue.
#[async_trait]
pub trait SyncHook: Send + Sync {
    /// Called before the request is issued. Returning [`Veto::Abort`]
    /// cancels the transaction.
    async fn before(&self, _event: &SyncEvent) -> Veto {
        Veto::Continue
    }

    /// Called once the transaction has settled. `event.status()` is set.
    async fn after(&self, _event: &SyncEvent, _outcome: &TransactionOutcome) {}
}

/// A hook built from a synchronous veto function.
pub struct VetoFn<F> {
    check: F,
}

impl<F> VetoFn<F>
where
    F: Fn(&SyncEvent) -> Veto + Send + Sync,
{
    /// Wrap `check`.
    pub fn new(check: F) -> Self {
        Self { check }
    }
}

#[async_trait]
impl<F> SyncHook for VetoFn<F>
where
    F: Fn(&SyncEvent) -> Veto + Send + Sync,
{
    async fn before(&self, event: &SyncEvent) -> Veto {
        (self.check)(event)
    }
}
