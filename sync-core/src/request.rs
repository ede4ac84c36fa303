//! Transaction request construction.
//!
//! [`TransactionRequest::build`] turns a method, a target and a closed set of
//! [`SyncOptions`] into the exact request the transport will issue. Nothing
//! here touches the network.

use changeq_sync_types::{Method, SyncError, Verb, JSON_CONTENT_TYPE};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::target::SyncTarget;

/// Transport-specific options passed through untouched (e.g. extra headers).
pub type RequestExtra = BTreeMap<String, String>;

/// Per-call configuration for a transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncOptions {
    /// Overrides the target's URL.
    pub url: Option<String>,
    /// Overrides the content type (default `application/json` for create/update).
    pub content_type: Option<String>,
    /// Custom body, used instead of the serialized target.
    pub body: Option<Value>,
    /// Minimum time between the call and its settlement.
    pub delay: Option<Duration>,
    /// Nest the outgoing body as `{ wrap_key: body }`.
    pub wrap_key: Option<String>,
    /// Opaque transport options.
    pub extra: RequestExtra,
}

impl SyncOptions {
    /// Options with every field at its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the request URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Override the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Send `body` instead of the serialized target.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Defer settlement until at least `delay` after the call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Same as [`with_delay`](Self::with_delay), in milliseconds.
    pub fn with_delay_ms(self, millis: u64) -> Self {
        self.with_delay(Duration::from_millis(millis))
    }

    /// Nest the outgoing body under `key`.
    pub fn with_wrap_key(mut self, key: impl Into<String>) -> Self {
        self.wrap_key = Some(key.into());
        self
    }

    /// Add an opaque transport option.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// A fully resolved request, ready for the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRequest {
    /// Logical operation.
    pub method: Method,
    /// HTTP verb, always `method.verb()`.
    pub verb: Verb,
    /// Target URL.
    pub url: String,
    /// Content type of `body`.
    pub content_type: Option<String>,
    /// Encoded body.
    pub body: Option<Vec<u8>>,
    /// Whether the transport may re-encode the body (only for `GET`).
    pub process_data: bool,
    /// Minimum time between the call and its settlement.
    pub delay: Option<Duration>,
    /// Opaque transport options.
    pub extra: RequestExtra,
}

impl TransactionRequest {
    /// Resolve the request for `method` on `target`.
    pub fn build<T: SyncTarget + ?Sized>(
        method: Method,
        target: &T,
        options: &SyncOptions,
    ) -> Result<Self, SyncError> {
        let verb = method.verb();
        let url = options.url.clone().unwrap_or_else(|| target.url());

        let payload = match (&options.body, method.carries_body()) {
            (Some(custom), _) => Some(custom.clone()),
            (None, true) => Some(target.serialize()),
            (None, false) => None,
        };
        let payload = match (&options.wrap_key, payload) {
            (Some(key), Some(inner)) => {
                let mut wrapper = Map::new();
                wrapper.insert(key.clone(), inner);
                Some(Value::Object(wrapper))
            }
            (_, payload) => payload,
        };

        let content_type = match (&options.content_type, method.carries_body()) {
            (Some(explicit), _) => Some(explicit.clone()),
            (None, true) => Some(JSON_CONTENT_TYPE.to_string()),
            (None, false) => None,
        };

        let body = payload
            .map(|value| serde_json::to_vec(&value).map_err(SyncError::Serialization))
            .transpose()?;

        Ok(Self {
            method,
            verb,
            url,
            content_type,
            body,
            process_data: verb == Verb::Get,
            delay: options.delay,
            extra: options.extra.clone(),
        })
    }

    /// Decode the body back into JSON.
    pub fn body_json(&self) -> Option<Value> {
        self.body
            .as_deref()
            .and_then(|bytes| serde_json::from_slice(bytes).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::StaticTarget;
    use serde_json::json;

    fn photo() -> StaticTarget {
        StaticTarget::new("/photos/7").with_body(json!({"id": 7, "title": "sunset"}))
    }

    #[test]
    fn verb_follows_method() {
        for method in Method::ALL {
            let req = TransactionRequest::build(method, &photo(), &SyncOptions::new()).unwrap();
            assert_eq!(req.verb, method.verb());
        }
    }

    #[test]
    fn update_sends_serialized_target_as_json() {
        let req = TransactionRequest::build(Method::Update, &photo(), &SyncOptions::new()).unwrap();

        assert_eq!(req.url, "/photos/7");
        assert_eq!(req.content_type.as_deref(), Some("application/json"));
        assert_eq!(req.body_json(), Some(json!({"id": 7, "title": "sunset"})));
        assert!(!req.process_data);
    }

    #[test]
    fn read_and_delete_have_no_body() {
        let read = TransactionRequest::build(Method::Read, &photo(), &SyncOptions::new()).unwrap();
        let delete =
            TransactionRequest::build(Method::Delete, &photo(), &SyncOptions::new()).unwrap();

        assert!(read.body.is_none());
        assert!(read.content_type.is_none());
        assert!(read.process_data);
        assert!(delete.body.is_none());
    }

    #[test]
    fn custom_body_replaces_serialized_target() {
        let options = SyncOptions::new().with_body(json!({"changes": []}));
        let req = TransactionRequest::build(Method::Update, &photo(), &options).unwrap();
        assert_eq!(req.body_json(), Some(json!({"changes": []})));
    }

    #[test]
    fn wrap_key_nests_body() {
        let options = SyncOptions::new().with_wrap_key("photo");
        let req = TransactionRequest::build(Method::Create, &photo(), &options).unwrap();
        assert_eq!(
            req.body_json(),
            Some(json!({"photo": {"id": 7, "title": "sunset"}}))
        );
    }

    #[test]
    fn url_and_content_type_overrides() {
        let options = SyncOptions::new()
            .with_url("/albums/1/photos")
            .with_content_type("application/vnd.api+json")
            .with_extra("X-Request-Id", "abc");
        let req = TransactionRequest::build(Method::Create, &photo(), &options).unwrap();

        assert_eq!(req.url, "/albums/1/photos");
        assert_eq!(req.content_type.as_deref(), Some("application/vnd.api+json"));
        assert_eq!(req.extra.get("X-Request-Id").map(String::as_str), Some("abc"));
    }

    #[test]
    fn delay_is_carried() {
        let options = SyncOptions::new().with_delay_ms(100);
        let req = TransactionRequest::build(Method::Read, &photo(), &options).unwrap();
        assert_eq!(req.delay, Some(Duration::from_millis(100)));
    }
}
