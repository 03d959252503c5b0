//! Response inspection helpers and DataDome constants.

use http::header::SERVER;
use url::Url;

use super::types::ChallengeResponse;

/// Exact `Server` header value sent by DataDome-protected edges.
pub const DATADOME_SERVER: &str = "DataDome";

/// Host serving the captcha (slider / GeeTest) challenge.
pub const CAPTCHA_DOMAIN: &str = "geo.captcha-delivery.com";

/// Host serving the interstitial (device check) challenge.
pub const INTERSTITIAL_DOMAIN: &str = "interstitial.captcha-delivery.com";

/// Cookie name DataDome reads on every request.
pub const DATADOME_COOKIE: &str = "datadome";

/// Detect whether the response was served by a DataDome edge.
pub fn is_datadome_response(response: &ChallengeResponse<'_>) -> bool {
    response
        .headers
        .get(SERVER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value == DATADOME_SERVER)
        .unwrap_or(false)
}

/// Build origin header value from URL (`scheme://host[:port]`).
pub fn origin_from_url(url: &Url) -> String {
    let mut origin = format!("{}://{}", url.scheme(), url.host_str().unwrap_or(""));
    if let Some(port) = url.port() {
        origin.push(':');
        origin.push_str(&port.to_string());
    }
    origin
}

/// Value of the `datadome` cookie inside a `Cookie` header line, if present.
pub fn datadome_cookie_from_header(cookie_header: &str) -> Option<&str> {
    cookie_header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == DATADOME_COOKIE)
        .map(|(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderMap;

    #[test]
    fn server_header_must_match_exactly() {
        let url = Url::parse("https://shop.example/").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(SERVER, "datadome".parse().unwrap());
        let response = ChallengeResponse {
            url: &url,
            status: 403,
            headers: &headers,
            body: "",
        };
        assert!(!is_datadome_response(&response));

        headers.insert(SERVER, "DataDome".parse().unwrap());
        let response = ChallengeResponse {
            url: &url,
            status: 403,
            headers: &headers,
            body: "",
        };
        assert!(is_datadome_response(&response));
    }

    #[test]
    fn origin_keeps_explicit_port() {
        let url = Url::parse("http://127.0.0.1:8080/path?q=1").unwrap();
        assert_eq!(origin_from_url(&url), "http://127.0.0.1:8080");
    }

    #[test]
    fn finds_datadome_in_cookie_header() {
        assert_eq!(
            datadome_cookie_from_header("_ga=1; datadome=abc~def; other=2"),
            Some("abc~def")
        );
        assert_eq!(datadome_cookie_from_header("_ga=1"), None);
    }
}
