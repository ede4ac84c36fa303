//! The capability an object needs to be persisted.

use serde_json::Value;

/// Anything that can be read, created, updated or deleted on a server.
pub trait SyncTarget {
    /// Resource URL for this target.
    fn url(&self) -> String;

    /// JSON representation sent as the body of create and update requests.
    fn serialize(&self) -> Value;

    /// Whether the target has never been persisted.
    fn is_new(&self) -> bool;
}

impl<T: SyncTarget + ?Sized> SyncTarget for &T {
    fn url(&self) -> String {
        (**self).url()
    }

    fn serialize(&self) -> Value {
        (**self).serialize()
    }

    fn is_new(&self) -> bool {
        (**self).is_new()
    }
}

/// A target with fixed values, for one-off transactions.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticTarget {
    /// Resource URL.
    pub url: String,
    /// Body for create and update.
    pub body: Value,
    /// Whether the target counts as unsaved.
    pub is_new: bool,
}

impl StaticTarget {
    /// A persisted target at `url` with a `null` body.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: Value::Null,
            is_new: false,
        }
    }

    /// Set the body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// Mark the target as never persisted.
    pub fn unsaved(mut self) -> Self {
        self.is_new = true;
        self
    }
}

impl SyncTarget for StaticTarget {
    fn url(&self) -> String {
        self.url.clone()
    }

    fn serialize(&self) -> Value {
        self.body.clone()
    }

    fn is_new(&self) -> bool {
        self.is_new
    }
}
