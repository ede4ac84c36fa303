//! CLI command implementations.

pub mod replay;
pub mod request;

use async_trait::async_trait;
use changeq_sync_client::{SyncEvent, SyncHook, TransactionOutcome, Veto};

/// Hook that logs every transaction as it is issued and settled.
pub struct LogHook;

#[async_trait]
impl SyncHook for LogHook {
    async fn before(&self, event: &SyncEvent) -> Veto {
        tracing::info!("{} {}", event.method, event.url);
        Veto::Continue
    }

    async fn after(&self, event: &SyncEvent, outcome: &TransactionOutcome) {
        match outcome {
            Ok(_) => tracing::info!(
                "{} {} -> {}",
                event.method,
                event.url,
                event.status().unwrap_or_default()
            ),
            Err(failure) => tracing::warn!("{} {} -> {}", event.method, event.url, failure),
        }
    }
}
