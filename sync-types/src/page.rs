//! Page-fetch response parsing.
//!
//! A page response places a run of item identifiers at a known offset of a
//! sparse collection. The identifier array lives under a configurable key.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::SyncError;

/// Default key of the identifier array.
pub const DEFAULT_IDS_KEY: &str = "itemIds";

/// Default key of the server-reported total item count.
pub const DEFAULT_TOTAL_KEY: &str = "totalItemCount";

/// A parsed page of identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResponse<Id> {
    /// Index of the first identifier within the collection.
    pub offset: usize,
    /// Identifiers for positions `[offset, offset + ids.len())`.
    pub ids: Vec<Id>,
    /// Total size reported by the server, if present.
    pub total: Option<usize>,
}

impl<Id: DeserializeOwned> PageResponse<Id> {
    /// Parse a page from a response body.
    ///
    /// `offset` and the identifier array are required. The total is
    /// optional. An offset whose range end does not fit a `usize` is
    /// rejected.
    pub fn from_value(value: &Value, ids_key: &str, total_key: &str) -> Result<Self, SyncError> {
        let object = value
            .as_object()
            .ok_or_else(|| SyncError::InvalidData("page response is not an object".into()))?;

        let offset = object
            .get("offset")
            .and_then(Value::as_u64)
            .ok_or_else(|| SyncError::InvalidData("page response has no integer offset".into()))?;

        let raw_ids = object.get(ids_key).ok_or_else(|| {
            SyncError::InvalidData(format!("page response has no `{ids_key}` array"))
        })?;
        if !raw_ids.is_array() {
            return Err(SyncError::InvalidData(format!("`{ids_key}` is not an array")));
        }
        let ids: Vec<Id> =
            serde_json::from_value(raw_ids.clone()).map_err(SyncError::Deserialization)?;

        let offset = usize::try_from(offset)
            .ok()
            .filter(|o| o.checked_add(ids.len()).is_some())
            .ok_or_else(|| SyncError::InvalidData(format!("page offset {offset} out of range")))?;

        let total = object
            .get(total_key)
            .and_then(Value::as_u64)
            .map(|t| usize::try_from(t).unwrap_or(usize::MAX));

        Ok(Self {
            offset,
            ids,
            total,
        })
    }
}
