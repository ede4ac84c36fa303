//! Change records and the batched flush body.
//!
//! A [`ChangeRecord`] describes one structural mutation of a synced
//! collection. Records are sent to the server in a [`ChangeBatch`]:
//!
//! ```json
//! { "changes": [ { "action": "add", "items": [100, 101], "at": 0 } ] }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::SyncError;

/// Kind of structural mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    /// Items inserted at `at`.
    Add,
    /// Items removed from `at`.
    Remove,
    /// Items moved to destination `at`.
    Move,
}

impl ChangeAction {
    /// Lowercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeAction::Add => "add",
            ChangeAction::Remove => "remove",
            ChangeAction::Move => "move",
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable entry of a change log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord<Id> {
    /// What happened.
    pub action: ChangeAction,
    /// Identifiers of the affected items, in collection order.
    pub items: Vec<Id>,
    /// Insertion index, removal index, or move destination.
    pub at: usize,
}

impl<Id> ChangeRecord<Id> {
    /// Items inserted at `at`.
    pub fn add(items: Vec<Id>, at: usize) -> Self {
        Self {
            action: ChangeAction::Add,
            items,
            at,
        }
    }

    /// Items removed from `at`.
    pub fn remove(items: Vec<Id>, at: usize) -> Self {
        Self {
            action: ChangeAction::Remove,
            items,
            at,
        }
    }

    /// Items moved to destination `at`.
    pub fn moved(items: Vec<Id>, at: usize) -> Self {
        Self {
            action: ChangeAction::Move,
            items,
            at,
        }
    }
}

/// Body of a flush request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBatch<Id> {
    /// Records in flush order.
    pub changes: Vec<ChangeRecord<Id>>,
}

impl<Id> ChangeBatch<Id> {
    /// Wrap a snapshot of records.
    pub fn new(changes: Vec<ChangeRecord<Id>>) -> Self {
        Self { changes }
    }
}

impl<Id: Serialize> ChangeBatch<Id> {
    /// Encode as a JSON value for the transaction body.
    pub fn to_value(&self) -> Result<serde_json::Value, SyncError> {
        serde_json::to_value(self).map_err(SyncError::Serialization)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_wire_shape() {
        let record = ChangeRecord::add(vec![100u64, 101], 0);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value, json!({"action": "add", "items": [100, 101], "at": 0}));
    }

    #[test]
    fn batch_wire_shape() {
        let batch = ChangeBatch::new(vec![
            ChangeRecord::moved(vec!["b".to_string()], 0),
            ChangeRecord::remove(vec!["b".to_string()], 0),
        ]);
        let value = batch.to_value().unwrap();
        assert_eq!(
            value,
            json!({"changes": [
                {"action": "move", "items": ["b"], "at": 0},
                {"action": "remove", "items": ["b"], "at": 0}
            ]})
        );
    }

    #[test]
    fn record_parses_from_wire() {
        let record: ChangeRecord<u32> =
            serde_json::from_str(r#"{"action":"remove","items":[7],"at":3}"#).unwrap();
        assert_eq!(record, ChangeRecord::remove(vec![7], 3));
        assert_eq!(record.action.to_string(), "remove");
    }
}
