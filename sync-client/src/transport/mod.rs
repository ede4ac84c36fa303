//! Transport abstraction for changeq.
//!
//! This module provides a pluggable HTTP layer that abstracts the client
//! library actually issuing requests (reqwest, mock for testing).
//!
//! # Design
//!
//! The transport trait is async and request/response oriented:
//! - `send()` issues one [`HttpRequest`] and yields an [`HttpResponse`]
//! - non-2xx responses may be returned as responses or as
//!   [`TransportError::Http`]; the syncer treats both as failures
//!
//! Body parsing and status classification happen in the syncer, so every
//! transport reports failures the same way.
//!
//! # Example
//!
//! ```ignore
//! let transport = MockTransport::new();
//! transport.queue_json(200, serde_json::json!({"ok": true}));
//! let response = transport.send(request).await?;
//! ```

mod http;
mod mock;

pub use http::ReqwestTransport;
pub use mock::MockTransport;

use async_trait::async_trait;
use changeq_sync_core::{RequestExtra, TransactionRequest};
use changeq_sync_types::{ResponseMeta, StatusText, SyncFailure, Verb};
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// The server answered with an error status.
    #[error("http status {status}: {reason}")]
    Http {
        /// Status code.
        status: u16,
        /// Reason phrase or body excerpt.
        reason: String,
    },

    /// The request could not be sent.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The request was aborted before completing.
    #[error("request aborted")]
    Aborted,

    /// The response body could not be read or decoded.
    #[error("invalid response body: {0}")]
    InvalidBody(String),
}

impl TransportError {
    /// Status text reported for this error.
    pub fn status_text(&self) -> StatusText {
        match self {
            TransportError::Timeout => StatusText::Timeout,
            TransportError::Http { .. } | TransportError::ConnectionFailed(_) => StatusText::Error,
            TransportError::Aborted => StatusText::Abort,
            TransportError::InvalidBody(_) => StatusText::ParserError,
        }
    }

    /// Convert into a settled transaction failure.
    pub fn into_failure(self) -> SyncFailure {
        let status = self.status_text();
        let meta = match &self {
            TransportError::Http { status, .. } => Some(ResponseMeta::with_status(*status)),
            _ => None,
        };
        let failure = SyncFailure::new(status, self.to_string());
        match meta {
            Some(meta) => failure.with_meta(meta),
            None => failure,
        }
    }
}

/// One request as handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// HTTP verb.
    pub verb: Verb,
    /// Target URL, absolute or relative to the transport's base URL.
    pub url: String,
    /// Content type of `body`.
    pub content_type: Option<String>,
    /// Encoded body.
    pub body: Option<Vec<u8>>,
    /// Whether the transport may re-encode `body` (e.g. into a query string).
    pub process_data: bool,
    /// Opaque options, sent as headers by the bundled transports.
    pub extra: RequestExtra,
}

impl HttpRequest {
    /// Decode the body as JSON, if there is one.
    pub fn body_json(&self) -> Option<serde_json::Value> {
        self.body
            .as_deref()
            .and_then(|bytes| serde_json::from_slice(bytes).ok())
    }
}

impl From<&TransactionRequest> for HttpRequest {
    fn from(request: &TransactionRequest) -> Self {
        Self {
            verb: request.verb,
            url: request.url.clone(),
            content_type: request.content_type.clone(),
            body: request.body.clone(),
            process_data: request.process_data,
            extra: request.extra.clone(),
        }
    }
}

/// A response received from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Reason phrase.
    pub status_text: String,
    /// Response headers.
    pub headers: Vec<(String, String)>,
    /// Raw body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// A `200 OK` response with an empty body.
    pub fn ok() -> Self {
        Self::with_body(200, Vec::new())
    }

    /// A response with the given status and raw body.
    pub fn with_body(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            status_text: reason_phrase(status).to_string(),
            headers: Vec::new(),
            body,
        }
    }

    /// A response whose body is the encoded JSON value.
    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        let mut response = Self::with_body(status, value.to_string().into_bytes());
        response
            .headers
            .push(("content-type".to_string(), "application/json".to_string()));
        response
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Transport metadata for outcomes.
    pub fn meta(&self) -> ResponseMeta {
        ResponseMeta {
            status: Some(self.status),
            headers: self.headers.clone(),
        }
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        409 => "Conflict",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "",
    }
}

/// HTTP transport used by the syncer.
///
/// Implementations handle the underlying client library
/// (reqwest, mock, etc).
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issue one request and wait for its response.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for std::sync::Arc<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request).await
    }
}
