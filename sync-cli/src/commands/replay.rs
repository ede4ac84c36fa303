//! Replay a file of change records against a collection.

use anyhow::{Context, Result};
use changeq_sync_client::{
    ChangeBatch, ChangeQueue, ChangeRecord, HttpTransport, QueueConfig, QueueEvent, Syncer,
};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// Read change records from `path`.
///
/// Accepts either a bare array of records or a `{"changes": [...]}` batch.
pub async fn load_changes(path: &Path) -> Result<Vec<ChangeRecord<Value>>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;

    let records = if value.is_array() {
        serde_json::from_value(value)?
    } else {
        let batch: ChangeBatch<Value> = serde_json::from_value(value)
            .context("Expected an array of changes or a {\"changes\": [...]} object")?;
        batch.changes
    };
    Ok(records)
}

/// Run the replay command.
pub async fn run<T: HttpTransport + 'static>(
    syncer: Arc<Syncer<T>>,
    path: &Path,
    url: &str,
    config: QueueConfig,
) -> Result<String> {
    let records = load_changes(path).await?;
    if records.is_empty() {
        return Ok("Nothing to replay".to_string());
    }

    let queue: ChangeQueue<Value, T> = ChangeQueue::new(syncer, url, config.with_auto_sync(false));
    queue.on(|event| {
        if let QueueEvent::SyncFailed { records, failure } = event {
            tracing::warn!("{} record(s) not synced: {}", records.len(), failure);
        }
    });
    for record in records {
        queue.record(record);
    }

    let summary = queue
        .flush()
        .await
        .with_context(|| format!("Replay to {} failed, {} record(s) pending", url, queue.len()))?;

    Ok(format!(
        "Replayed {} record(s) to {} in {} batch(es)",
        summary.records, url, summary.batches
    ))
}
