//! Challenge detection module.
//!
//! Decides whether a response is a DataDome challenge page and pulls the
//! minted `datadome` cookie out of the cookie endpoint's JSON reply.
//!
//! The detection rule is deliberately simple: the response must carry the
//! `Server: DataDome` header, and then either be a 403 or reference one of the
//! captcha-delivery hosts. Sites that serve challenges differently will need
//! their own checks layered on top.

use serde::Deserialize;

use crate::challenges::core::{
    CAPTCHA_DOMAIN, ChallengeResponse, DataDomeError, DataDomeResult, INTERSTITIAL_DOMAIN,
    is_datadome_response,
};
use crate::challenges::solvers::ChallengeType;

const COOKIE_EXTRACTION_FAILED: &str = "Could not extract cookie from response";

/// Evidence that made the detector flag a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChallengeIndicator {
    /// `Server: DataDome` with a 403 status.
    Forbidden,
    /// Body references the captcha delivery host.
    CaptchaDomain,
    /// Body references the interstitial delivery host.
    InterstitialDomain,
}

/// Detection output returned to the caller.
#[derive(Debug, Clone)]
pub struct ChallengeDetection {
    pub status_code: u16,
    pub url: String,
    pub matched_indicators: Vec<ChallengeIndicator>,
    /// Variant suggested by the page body. Informational only; the solving
    /// service decides the real type during the build-url step.
    pub hinted_type: Option<ChallengeType>,
}

/// Stateless DataDome challenge detector.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChallengeDetector;

impl ChallengeDetector {
    pub fn new() -> Self {
        Self
    }

    /// Returns `true` when the response looks like a DataDome challenge.
    pub fn is_challenge(response: &ChallengeResponse<'_>) -> bool {
        if !is_datadome_response(response) {
            return false;
        }
        response.status == 403
            || response.body.contains(CAPTCHA_DOMAIN)
            || response.body.contains(INTERSTITIAL_DOMAIN)
    }

    /// Same decision as [`ChallengeDetector::is_challenge`], with the
    /// indicators that matched.
    pub fn detect(response: &ChallengeResponse<'_>) -> Option<ChallengeDetection> {
        if !is_datadome_response(response) {
            return None;
        }

        let mut indicators = Vec::new();
        if response.status == 403 {
            indicators.push(ChallengeIndicator::Forbidden);
        }
        if response.body.contains(CAPTCHA_DOMAIN) {
            indicators.push(ChallengeIndicator::CaptchaDomain);
        }
        if response.body.contains(INTERSTITIAL_DOMAIN) {
            indicators.push(ChallengeIndicator::InterstitialDomain);
        }

        if indicators.is_empty() {
            return None;
        }

        let hinted_type = if indicators.contains(&ChallengeIndicator::InterstitialDomain) {
            Some(ChallengeType::Interstitial)
        } else if indicators.contains(&ChallengeIndicator::CaptchaDomain) {
            Some(ChallengeType::Geetest)
        } else {
            None
        };

        log::debug!(
            "datadome challenge detected at {} (status {}, indicators {:?})",
            response.url,
            response.status,
            indicators
        );

        Some(ChallengeDetection {
            status_code: response.status,
            url: response.url.to_string(),
            matched_indicators: indicators,
            hinted_type,
        })
    }

    /// Extract the `datadome` cookie value from the cookie endpoint reply.
    ///
    /// The reply body is JSON with a `cookie` field shaped like
    /// `datadome=<value>; Max-Age=...; Domain=...`. Every failure collapses into
    /// one [`DataDomeError::BadResponse`].
    pub fn extract_cookie(response: &ChallengeResponse<'_>) -> DataDomeResult<String> {
        Self::extract_cookie_from_body(response.body)
    }

    /// Raw-body variant of [`ChallengeDetector::extract_cookie`].
    pub fn extract_cookie_from_body(body: &str) -> DataDomeResult<String> {
        #[derive(Deserialize)]
        struct CookieReply {
            cookie: Option<String>,
        }

        let reply: CookieReply = serde_json::from_str(body)
            .map_err(|err| DataDomeError::bad_response_with(COOKIE_EXTRACTION_FAILED, err))?;

        reply
            .cookie
            .as_deref()
            .and_then(|cookie| cookie.split(';').next())
            .and_then(|pair| pair.split_once('='))
            .map(|(_, value)| value.split('=').next().unwrap_or_default().to_string())
            .ok_or_else(|| DataDomeError::bad_response(COOKIE_EXTRACTION_FAILED))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderMap, header::SERVER};
    use url::Url;

    struct ResponseFixture {
        url: Url,
        headers: HeaderMap,
        body: String,
        status: u16,
    }

    impl ResponseFixture {
        fn new(server: Option<&str>, status: u16, body: &str) -> Self {
            let mut headers = HeaderMap::new();
            if let Some(server) = server {
                headers.insert(SERVER, server.parse().unwrap());
            }
            Self {
                url: Url::parse("https://www.footlocker.pt/en/product/~/314206535404.html")
                    .unwrap(),
                headers,
                body: body.to_string(),
                status,
            }
        }

        fn response(&self) -> ChallengeResponse<'_> {
            ChallengeResponse {
                url: &self.url,
                status: self.status,
                headers: &self.headers,
                body: &self.body,
            }
        }
    }

    const CAPTCHA_BODY: &str =
        r#"<html><script>var dd={'rt':'c','host':'geo.captcha-delivery.com'}</script></html>"#;
    const INTERSTITIAL_BODY: &str =
        r#"<html><script src="https://interstitial.captcha-delivery.com/i.js"></script></html>"#;

    #[test]
    fn foreign_server_is_never_a_challenge() {
        for (server, status, body) in [
            (None, 403, CAPTCHA_BODY),
            (Some("cloudflare"), 403, INTERSTITIAL_BODY),
            (Some("nginx"), 200, CAPTCHA_BODY),
            (Some("datadome"), 403, ""),
        ] {
            let fixture = ResponseFixture::new(server, status, body);
            assert!(!ChallengeDetector::is_challenge(&fixture.response()));
            assert!(ChallengeDetector::detect(&fixture.response()).is_none());
        }
    }

    #[test]
    fn forbidden_datadome_response_is_challenge() {
        let fixture = ResponseFixture::new(Some("DataDome"), 403, "<html></html>");
        assert!(ChallengeDetector::is_challenge(&fixture.response()));

        let detection = ChallengeDetector::detect(&fixture.response()).unwrap();
        assert_eq!(detection.matched_indicators, vec![ChallengeIndicator::Forbidden]);
        assert_eq!(detection.hinted_type, None);
        assert_eq!(detection.status_code, 403);
    }

    #[test]
    fn challenge_domains_in_body_flag_ok_responses() {
        let captcha = ResponseFixture::new(Some("DataDome"), 200, CAPTCHA_BODY);
        assert!(ChallengeDetector::is_challenge(&captcha.response()));
        let detection = ChallengeDetector::detect(&captcha.response()).unwrap();
        assert_eq!(detection.hinted_type, Some(ChallengeType::Geetest));

        let interstitial = ResponseFixture::new(Some("DataDome"), 200, INTERSTITIAL_BODY);
        assert!(ChallengeDetector::is_challenge(&interstitial.response()));
        let detection = ChallengeDetector::detect(&interstitial.response()).unwrap();
        assert_eq!(detection.hinted_type, Some(ChallengeType::Interstitial));
    }

    #[test]
    fn plain_datadome_page_is_not_a_challenge() {
        let fixture = ResponseFixture::new(Some("DataDome"), 200, "<html>product</html>");
        assert!(!ChallengeDetector::is_challenge(&fixture.response()));
        assert!(ChallengeDetector::detect(&fixture.response()).is_none());
    }

    #[test]
    fn extracts_cookie_value() {
        let fixture = ResponseFixture::new(None, 200, r#"{"cookie": "abc=123; Path=/"}"#);
        assert_eq!(
            ChallengeDetector::extract_cookie(&fixture.response()).unwrap(),
            "123"
        );
        assert_eq!(
            ChallengeDetector::extract_cookie_from_body(
                r#"{"cookie":"datadome=XYZ; Max-Age=31536000"}"#
            )
            .unwrap(),
            "XYZ"
        );
    }

    #[test]
    fn unusable_cookie_bodies_are_bad_responses() {
        for body in [
            r#"{"status": 200}"#,
            "<html>blocked</html>",
            r#"{"cookie": 42}"#,
            r#"{"cookie": "no-separator; Path=/"}"#,
            r#"{"cookie": null}"#,
        ] {
            let err = ChallengeDetector::extract_cookie_from_body(body).expect_err(body);
            assert!(matches!(err, DataDomeError::BadResponse { .. }));
            assert_eq!(err.message(), "Could not extract cookie from response");
        }
    }
}
