//! Logical sync methods and the HTTP verbs they map to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::SyncError;

/// A logical persistence operation on a sync target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Fetch the target's server state.
    Read,
    /// Persist a target that has never been saved.
    Create,
    /// Replace the server state of an existing target.
    Update,
    /// Remove the target from the server.
    Delete,
}

impl Method {
    /// All methods, in declaration order.
    pub const ALL: [Method; 4] = [Method::Read, Method::Create, Method::Update, Method::Delete];

    /// The HTTP verb this method is issued with.
    pub fn verb(self) -> Verb {
        match self {
            Method::Read => Verb::Get,
            Method::Create => Verb::Post,
            Method::Update => Verb::Put,
            Method::Delete => Verb::Delete,
        }
    }

    /// Whether this method sends the serialized target as its body.
    pub fn carries_body(self) -> bool {
        matches!(self, Method::Create | Method::Update)
    }

    /// Lowercase name used in events and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Read => "read",
            Method::Create => "create",
            Method::Update => "update",
            Method::Delete => "delete",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "read" => Ok(Method::Read),
            "create" => Ok(Method::Create),
            "update" => Ok(Method::Update),
            "delete" => Ok(Method::Delete),
            other => Err(SyncError::UnknownMethod(other.to_string())),
        }
    }
}

/// HTTP verb for an issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
}

impl Verb {
    /// Uppercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
