//! Browser header profiles.
//!
//! DataDome scores the header set of every request, so the page load and the
//! challenge iframe load each get the headers a desktop Chrome would send for
//! that kind of navigation. The user agent is configurable; the rest is fixed.

use http::header::{HeaderMap, HeaderName, HeaderValue, REFERER, USER_AGENT};
use once_cell::sync::Lazy;
use thiserror::Error;
use url::Url;

use crate::challenges::core::origin_from_url;

/// User agent sent to the solving service and to protected sites by default.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36";

const ACCEPT_DOCUMENT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7";
const SEC_CH_UA: &str = r#""Google Chrome";v="119", "Chromium";v="119", "Not?A_Brand";v="24""#;

#[derive(Debug, Error)]
pub enum UserAgentError {
    #[error("invalid header value for '{0}'")]
    InvalidHeader(&'static str),
}

/// Top-level document navigation typed into the address bar.
static NAVIGATION_HEADERS: Lazy<HeaderMap> = Lazy::new(|| {
    header_map(&[
        ("accept", ACCEPT_DOCUMENT),
        ("accept-language", "en-GB,en;q=0.9"),
        ("cache-control", "max-age=0"),
        ("sec-ch-ua", SEC_CH_UA),
        ("sec-ch-ua-mobile", "?0"),
        ("sec-ch-ua-platform", "\"macOS\""),
        ("sec-fetch-dest", "document"),
        ("sec-fetch-mode", "navigate"),
        ("sec-fetch-site", "none"),
        ("sec-fetch-user", "?1"),
        ("upgrade-insecure-requests", "1"),
    ])
});

/// Cross-site iframe load of the captcha-delivery page.
static CHALLENGE_HEADERS: Lazy<HeaderMap> = Lazy::new(|| {
    header_map(&[
        ("accept", ACCEPT_DOCUMENT),
        ("accept-language", "en-GB,en;q=0.9"),
        ("sec-ch-ua", SEC_CH_UA),
        ("sec-ch-ua-mobile", "?0"),
        ("sec-ch-ua-platform", "\"macOS\""),
        ("sec-fetch-dest", "iframe"),
        ("sec-fetch-mode", "navigate"),
        ("sec-fetch-site", "cross-site"),
        ("upgrade-insecure-requests", "1"),
    ])
});

fn header_map(entries: &[(&'static str, &'static str)]) -> HeaderMap {
    let mut map = HeaderMap::with_capacity(entries.len());
    for &(name, value) in entries {
        map.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
    map
}

/// Header profile tied to one user agent.
#[derive(Debug, Clone)]
pub struct BrowserProfile {
    user_agent: String,
}

impl BrowserProfile {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Headers for loading the protected page itself.
    pub fn navigation_headers(&self) -> Result<HeaderMap, UserAgentError> {
        let mut headers = NAVIGATION_HEADERS.clone();
        headers.insert(USER_AGENT, self.user_agent_value()?);
        Ok(headers)
    }

    /// Headers for loading the challenge URL, as the iframe embedded in
    /// `target` would.
    pub fn challenge_headers(&self, target: &Url) -> Result<HeaderMap, UserAgentError> {
        let mut headers = CHALLENGE_HEADERS.clone();
        headers.insert(USER_AGENT, self.user_agent_value()?);
        let referer = HeaderValue::from_str(&format!("{}/", origin_from_url(target)))
            .map_err(|_| UserAgentError::InvalidHeader("referer"))?;
        headers.insert(REFERER, referer);
        Ok(headers)
    }

    fn user_agent_value(&self) -> Result<HeaderValue, UserAgentError> {
        HeaderValue::from_str(&self.user_agent)
            .map_err(|_| UserAgentError::InvalidHeader("user-agent"))
    }
}

impl Default for BrowserProfile {
    fn default() -> Self {
        Self::new(DEFAULT_USER_AGENT)
    }
}
