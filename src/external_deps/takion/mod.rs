//! TakionAPI wire client.
//!
//! Typed requests and replies for the DataDome endpoints of the remote
//! solving service. Every call is a JSON `POST` to
//! `{base}/datadome/<endpoint>?api_key=<key>` carrying the caller's
//! `User-Agent`. HTTP status codes are not inspected; the service reports
//! failures through an `error` field in the body.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

use crate::config::{ConfigError, SolverConfig};

/// Endpoint that turns a blocked page into the challenge URL.
pub const BUILD_URL_ENDPOINT: &str = "build-url";

/// Errors raised by the wire layer before any reply semantics are applied.
#[derive(Debug, Error)]
pub enum TakionError {
    #[error("invalid endpoint url: {0}")]
    Url(#[from] url::ParseError),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("undecodable reply: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Body of `POST /datadome/build-url`.
#[derive(Debug, Clone, Serialize)]
pub struct BuildUrlRequest<'a> {
    pub html: &'a str,
    /// Current `datadome` cookie; serialized as `null` when absent.
    pub cid: Option<&'a str>,
    pub referrer: &'a str,
}

/// Reply of `POST /datadome/build-url`.
///
/// Fields stay undecoded so an unexpected shape (an `error` object, a numeric
/// type) never turns a service answer into a decode failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildUrlReply {
    #[serde(default)]
    pub url: Option<Value>,
    #[serde(default)]
    pub challenge_type: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl BuildUrlReply {
    /// The challenge URL, when present as a non-empty string.
    pub fn challenge_url(&self) -> Option<&str> {
        self.url
            .as_ref()
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().and_then(remote_error_message)
    }
}

/// Text of a truthy `error` field; `null`, `false` and `""` are not errors.
/// Non-string values are reported as their JSON text.
pub fn remote_error_message(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// Body of `POST /datadome/<challenge_type>`.
#[derive(Debug, Clone, Serialize)]
pub struct SolveRequest<'a> {
    pub html: &'a str,
}

/// Thin async client over the solving service.
#[derive(Debug, Clone)]
pub struct TakionClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl TakionClient {
    pub fn new(config: &SolverConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Self::with_http_client(config, http)
    }

    /// Reuse an existing reqwest client (proxy, TLS settings...).
    pub fn with_http_client(
        config: &SolverConfig,
        http: reqwest::Client,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            http,
            base_url: config.base_url()?,
            api_key: config.api_key.clone(),
        })
    }

    /// Full URL of a DataDome endpoint, credential included.
    pub fn endpoint_url(&self, endpoint: &str) -> Result<Url, url::ParseError> {
        let raw = format!(
            "{}/datadome/{}",
            self.base_url.as_str().trim_end_matches('/'),
            endpoint
        );
        Url::parse_with_params(&raw, &[("api_key", self.api_key.as_str())])
    }

    pub async fn build_url(
        &self,
        request: &BuildUrlRequest<'_>,
        user_agent: &str,
    ) -> Result<BuildUrlReply, TakionError> {
        self.post_json(BUILD_URL_ENDPOINT, request, user_agent).await
    }

    /// Ask the service to solve a challenge of the given type. The reply is
    /// returned undecoded so the caller can inspect `error` before anything
    /// else.
    pub async fn solve(
        &self,
        endpoint: &str,
        request: &SolveRequest<'_>,
        user_agent: &str,
    ) -> Result<Map<String, Value>, TakionError> {
        self.post_json(endpoint, request, user_agent).await
    }

    async fn post_json<B, R>(
        &self,
        endpoint: &str,
        body: &B,
        user_agent: &str,
    ) -> Result<R, TakionError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.endpoint_url(endpoint)?;
        log::debug!("POST {} ({})", url.path(), endpoint);

        let response = self
            .http
            .post(url)
            .header(reqwest::header::USER_AGENT, user_agent)
            .json(body)
            .send()
            .await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        log::debug!("{} answered {} ({} bytes)", endpoint, status, bytes.len());

        Ok(serde_json::from_slice(&bytes)?)
    }
}
