//! Transaction outcomes.
//!
//! Every transaction settles exactly once, either as a [`SyncSuccess`] or a
//! [`SyncFailure`]. Failures are values carried in the `Err` arm of
//! [`TransactionOutcome`], never panics.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::SyncError;

/// Status string reported for a successful transaction.
pub const STATUS_SUCCESS: &str = "success";

/// Result of one transaction.
pub type TransactionOutcome = Result<SyncSuccess, SyncFailure>;

/// Failure classification, as reported in the status side channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusText {
    /// The request did not complete in time.
    Timeout,
    /// Network failure or an HTTP error status.
    Error,
    /// Vetoed before issue, or aborted by the transport.
    Abort,
    /// The response body could not be parsed.
    #[serde(rename = "parsererror")]
    ParserError,
}

impl StatusText {
    /// Wire name of this status.
    pub fn as_str(self) -> &'static str {
        match self {
            StatusText::Timeout => "timeout",
            StatusText::Error => "error",
            StatusText::Abort => "abort",
            StatusText::ParserError => "parsererror",
        }
    }
}

impl fmt::Display for StatusText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusText {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "timeout" => Ok(StatusText::Timeout),
            "error" => Ok(StatusText::Error),
            "abort" => Ok(StatusText::Abort),
            "parsererror" => Ok(StatusText::ParserError),
            other => Err(SyncError::InvalidData(format!("unknown status: {other}"))),
        }
    }
}

/// Transport metadata attached to a response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMeta {
    /// HTTP status code, if a response was received.
    pub status: Option<u16>,
    /// Response headers, in arrival order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<(String, String)>,
}

impl ResponseMeta {
    /// Metadata with only a status code.
    pub fn with_status(status: u16) -> Self {
        Self {
            status: Some(status),
            headers: Vec::new(),
        }
    }
}

/// A settled, successful transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSuccess {
    /// Parsed response body, `None` when there was no body or no request.
    pub data: Option<Value>,
    /// Status text reported by the transport.
    pub status_text: String,
    /// Transport metadata, `None` when no request was issued.
    pub meta: Option<ResponseMeta>,
}

impl SyncSuccess {
    /// A success with a body and no metadata.
    pub fn with_data(data: Value) -> Self {
        Self {
            data: Some(data),
            status_text: STATUS_SUCCESS.to_string(),
            meta: None,
        }
    }

    /// The success reported when nothing had to be sent.
    pub fn no_op() -> Self {
        Self {
            data: None,
            status_text: STATUS_SUCCESS.to_string(),
            meta: None,
        }
    }
}

/// A settled, failed transaction.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{status}: {message}")]
pub struct SyncFailure {
    /// Failure classification.
    pub status: StatusText,
    /// Human-readable description.
    pub message: String,
    /// Transport metadata, if a response was received.
    pub meta: Option<ResponseMeta>,
}

impl SyncFailure {
    /// Create a failure without metadata.
    pub fn new(status: StatusText, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            meta: None,
        }
    }

    /// The failure reported when a listener vetoes a transaction.
    pub fn aborted() -> Self {
        Self::new(StatusText::Abort, "aborted by listener")
    }

    /// Attach transport metadata.
    pub fn with_meta(mut self, meta: ResponseMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Whether this failure came from a pre-flight veto or transport abort.
    pub fn is_abort(&self) -> bool {
        self.status == StatusText::Abort
    }
}
