use std::env;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::challenges::user_agents::DEFAULT_USER_AGENT;

/// Public TakionAPI endpoint.
pub const DEFAULT_BASE_URL: &str = "https://takionapi.tech";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "TAKION_API_KEY";

/// Environment variable overriding the service base URL.
pub const BASE_URL_ENV: &str = "TAKION_API_BASE_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing api key")]
    MissingApiKey,
    #[error("invalid base url '{0}': {1}")]
    InvalidBaseUrl(String, url::ParseError),
    #[error("invalid configuration json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Settings for talking to the remote solving service.
///
/// `timeout` is off by default; the solver itself never retries or times out
/// on its own.
#[derive(Debug, Clone, Deserialize)]
pub struct SolverConfig {
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default, rename = "timeout_secs", deserialize_with = "deserialize_timeout")]
    pub timeout: Option<Duration>,
}

impl SolverConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            timeout: None,
        }
    }

    pub fn builder() -> SolverConfigBuilder {
        SolverConfigBuilder::default()
    }

    /// Read `TAKION_API_KEY` and, when set, `TAKION_API_BASE_URL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env::var(API_KEY_ENV).map_err(|_| ConfigError::MissingApiKey)?;
        let mut builder = Self::builder().api_key(api_key);
        if let Ok(base_url) = env::var(BASE_URL_ENV) {
            builder = builder.base_url(base_url);
        }
        builder.build()
    }

    /// Load from a JSON document such as
    /// `{"api_key": "...", "base_url": "...", "timeout_secs": 30}`.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Parsed base URL of the solving service.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.base_url)
            .map_err(|err| ConfigError::InvalidBaseUrl(self.base_url.clone(), err))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        self.base_url()?;
        Ok(())
    }
}

/// Fluent builder for [`SolverConfig`].
#[derive(Debug, Default, Clone)]
pub struct SolverConfigBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    user_agent: Option<String>,
    timeout: Option<Duration>,
}

impl SolverConfigBuilder {
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<SolverConfig, ConfigError> {
        let config = SolverConfig {
            api_key: self.api_key.ok_or(ConfigError::MissingApiKey)?,
            base_url: self.base_url.unwrap_or_else(default_base_url),
            user_agent: self.user_agent.unwrap_or_else(default_user_agent),
            timeout: self.timeout,
        };
        config.validate()?;
        Ok(config)
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn deserialize_timeout<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_applies_defaults() {
        let config = SolverConfig::builder().api_key("TAKION_API_XXXX").build().unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert!(config.timeout.is_none());
    }

    #[test]
    fn builder_requires_api_key() {
        let err = SolverConfig::builder().build().unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey));

        let err = SolverConfig::builder().api_key("  ").build().unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey));
    }

    #[test]
    fn builder_rejects_bad_base_url() {
        let err = SolverConfig::builder()
            .api_key("key")
            .base_url("not a url")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl(..)));
    }

    #[test]
    fn loads_from_json() {
        let config = SolverConfig::from_json_str(
            r#"{"api_key": "key", "base_url": "http://127.0.0.1:9000", "timeout_secs": 30}"#,
        )
        .unwrap();
        assert_eq!(config.api_key, "key");
        assert_eq!(config.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);

        let config = SolverConfig::from_json_str(r#"{"api_key": "key"}"#).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.timeout.is_none());
    }

    #[test]
    fn json_without_key_fails() {
        let err = SolverConfig::from_json_str(r#"{"base_url": "https://x"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }
}
