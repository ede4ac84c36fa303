//! HTTP transport backed by reqwest.

use super::{HttpRequest, HttpResponse, HttpTransport, TransportError};
use crate::config::TransportConfig;
use async_trait::async_trait;
use changeq_sync_types::Verb;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use std::time::Duration;

/// Transport that issues real HTTP requests.
///
/// Relative request URLs are resolved against the configured base URL.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl ReqwestTransport {
    /// Wrap an existing client.
    pub fn with_client(client: reqwest::Client, base_url: Option<String>) -> Self {
        Self { client, base_url }
    }

    /// Build a client from configuration.
    pub fn from_config(config: &TransportConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        Ok(Self::with_client(client, config.base_url.clone()))
    }

    /// Base URL that relative request URLs are resolved against.
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }
        match &self.base_url {
            Some(base) => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                url.trim_start_matches('/')
            ),
            None => url.to_string(),
        }
    }
}

/// Flatten a JSON object body into query pairs for a `GET`.
fn query_pairs(body: &[u8]) -> Option<Vec<(String, String)>> {
    let value: Value = serde_json::from_slice(body).ok()?;
    let object = value.as_object()?;
    let pairs = object
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| {
            let rendered = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), rendered)
        })
        .collect();
    Some(pairs)
}

fn map_send_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_decode() || error.is_body() {
        TransportError::InvalidBody(error.to_string())
    } else {
        TransportError::ConnectionFailed(error.to_string())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = match request.verb {
            Verb::Get => reqwest::Method::GET,
            Verb::Post => reqwest::Method::POST,
            Verb::Put => reqwest::Method::PUT,
            Verb::Delete => reqwest::Method::DELETE,
        };
        let url = self.resolve_url(&request.url);

        let mut builder = self.client.request(method, &url);
        if let Some(content_type) = &request.content_type {
            builder = builder.header(CONTENT_TYPE, content_type.as_str());
        }
        for (name, value) in &request.extra {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            let as_query = if request.process_data && request.verb == Verb::Get {
                query_pairs(&body)
            } else {
                None
            };
            builder = match as_query {
                Some(pairs) => builder.query(&pairs),
                None => builder.body(body),
            };
        }

        tracing::debug!("{} {}", request.verb, url);
        let response = builder.send().await.map_err(map_send_error)?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = response.bytes().await.map_err(map_send_error)?;

        if !status.is_success() {
            return Err(TransportError::Http {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body: body.to_vec(),
        })
    }
}
