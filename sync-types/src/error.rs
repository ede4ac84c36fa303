//! Error types for changeq wire handling.

use thiserror::Error;

/// Errors that can occur while encoding or decoding wire data.
#[derive(Debug, Error)]
pub enum SyncError {
    /// JSON serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// JSON deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] serde_json::Error),

    /// Method name not recognized
    #[error("unknown sync method: {0}")]
    UnknownMethod(String),

    /// Invalid data format
    #[error("invalid data: {0}")]
    InvalidData(String),
}
