//! Core data structures shared across challenge detection and solving layers.

use http::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

/// Minimal representation of an HTTP response inspected by the detector and
/// forwarded to the solving service.
#[derive(Debug, Clone)]
pub struct ChallengeResponse<'a> {
    pub url: &'a Url,
    pub status: u16,
    pub headers: &'a HeaderMap,
    pub body: &'a str,
}

/// Request the caller must issue to mint the `datadome` cookie.
///
/// Holds the solve reply exactly as the service sent it. By contract it has a
/// `url`, a `payload` and a `headers` key, but nothing is checked until the
/// request is submitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CookieRequest {
    raw: Map<String, Value>,
}

impl CookieRequest {
    pub fn new(url: impl Into<String>) -> Self {
        let mut raw = Map::new();
        raw.insert("url".into(), Value::String(url.into()));
        Self { raw }
    }

    /// Wrap a decoded solve reply.
    pub fn from_reply(raw: Map<String, Value>) -> Self {
        Self { raw }
    }

    pub fn insert_payload(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert_nested("payload", key.into(), value.into())
    }

    pub fn insert_header(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert_nested("headers", key.into(), Value::String(value.into()))
    }

    /// Target of the cookie request, when the reply carries it as a string.
    pub fn url(&self) -> Option<&str> {
        self.raw.get("url").and_then(Value::as_str)
    }

    /// Form fields (an object) or a pre-encoded body (a string).
    pub fn payload(&self) -> Option<&Value> {
        self.raw.get("payload")
    }

    pub fn headers(&self) -> Option<&Value> {
        self.raw.get("headers")
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.raw
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.raw
    }

    fn insert_nested(mut self, field: &str, key: String, value: Value) -> Self {
        let mut map = match self.raw.remove(field) {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        map.insert(key, value);
        self.raw.insert(field.to_string(), Value::Object(map));
        self
    }
}
