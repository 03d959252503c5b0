//! Cookie request execution utilities.
//!
//! Issues the cookie-minting request described by the solving service through
//! a pluggable transport so the caller's session (and its cookie jar) is the
//! one that talks to DataDome. The solve reply is kept verbatim until here;
//! this is where it gets turned into form fields or a raw body.

use std::collections::HashMap;

use async_trait::async_trait;
use http::Method;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

use super::types::{ChallengeResponse, CookieRequest};

/// Contract that abstracts the underlying HTTP transport used to mint the
/// access cookie.
///
/// Implementations should share cookie storage with the session that loads
/// the protected site so the minted cookie lands in the same jar.
#[async_trait]
pub trait ChallengeHttpClient: Send + Sync {
    async fn send_form(
        &self,
        method: &Method,
        url: &Url,
        headers: &HeaderMap,
        form_fields: &HashMap<String, String>,
    ) -> Result<ChallengeHttpResponse, ChallengeHttpClientError>;

    /// Send a body that is already encoded.
    async fn send_body(
        &self,
        method: &Method,
        url: &Url,
        headers: &HeaderMap,
        body: Vec<u8>,
    ) -> Result<ChallengeHttpResponse, ChallengeHttpClientError>;
}

/// Minimal response representation returned by the transport abstraction.
#[derive(Debug, Clone)]
pub struct ChallengeHttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    pub url: Url,
}

impl ChallengeHttpResponse {
    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Borrowed view over this response with a caller-owned body string.
    pub fn as_challenge_response<'a>(&'a self, body: &'a str) -> ChallengeResponse<'a> {
        ChallengeResponse {
            url: &self.url,
            status: self.status,
            headers: &self.headers,
            body,
        }
    }
}

#[derive(Debug, Error)]
pub enum ChallengeHttpClientError {
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum ChallengeExecutionError {
    #[error("cookie request has no '{0}'")]
    MissingField(&'static str),
    #[error("cookie request '{field}' must be {expected}, got {found}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
        found: String,
    },
    #[error("failed to convert header '{0}'")]
    InvalidHeader(String),
    #[error("invalid cookie request url '{0}': {1}")]
    InvalidUrl(String, #[source] url::ParseError),
    #[error("http client error: {0}")]
    Client(#[from] ChallengeHttpClientError),
}

/// What goes on the wire for a cookie request.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RequestBody {
    Form(HashMap<String, String>),
    Raw(Vec<u8>),
}

/// POST the solver-provided payload to the cookie endpoint and return the raw
/// response. The caller extracts the cookie from it.
///
/// An object `payload` is form-encoded (non-string values are sent as their
/// JSON text), a string `payload` is sent as the body unchanged and a missing
/// or `null` one sends an empty form.
pub async fn submit_cookie_request(
    client: &dyn ChallengeHttpClient,
    request: &CookieRequest,
) -> Result<ChallengeHttpResponse, ChallengeExecutionError> {
    let url = request_url(request)?;
    let headers = convert_headers(request.headers())?;
    let body = request_body(request.payload())?;

    log::debug!("submitting cookie request to {}", url);
    let response = match body {
        RequestBody::Form(fields) => {
            client
                .send_form(&Method::POST, &url, &headers, &fields)
                .await?
        }
        RequestBody::Raw(bytes) => client.send_body(&Method::POST, &url, &headers, bytes).await?,
    };
    log::debug!("cookie endpoint answered {}", response.status);

    Ok(response)
}

fn request_url(request: &CookieRequest) -> Result<Url, ChallengeExecutionError> {
    match request.get("url") {
        None | Some(Value::Null) => Err(ChallengeExecutionError::MissingField("url")),
        Some(Value::String(raw)) => {
            Url::parse(raw).map_err(|err| ChallengeExecutionError::InvalidUrl(raw.clone(), err))
        }
        Some(other) => Err(invalid_field("url", "a string", other)),
    }
}

fn request_body(payload: Option<&Value>) -> Result<RequestBody, ChallengeExecutionError> {
    match payload {
        None | Some(Value::Null) => Ok(RequestBody::Form(HashMap::new())),
        Some(Value::String(raw)) => Ok(RequestBody::Raw(raw.clone().into_bytes())),
        Some(Value::Object(fields)) => Ok(RequestBody::Form(
            fields
                .iter()
                .map(|(key, value)| (key.clone(), form_value(value)))
                .collect(),
        )),
        Some(other) => Err(invalid_field("payload", "an object or a string", other)),
    }
}

fn form_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn convert_headers(headers: Option<&Value>) -> Result<HeaderMap, ChallengeExecutionError> {
    let entries: &Map<String, Value> = match headers {
        None | Some(Value::Null) => return Ok(HeaderMap::new()),
        Some(Value::Object(entries)) => entries,
        Some(other) => return Err(invalid_field("headers", "an object", other)),
    };

    let mut map = HeaderMap::new();
    for (name, value) in entries {
        let text = match value {
            Value::Array(_) | Value::Object(_) => {
                return Err(invalid_field("headers", "an object of scalar values", value));
            }
            scalar => form_value(scalar),
        };
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ChallengeExecutionError::InvalidHeader(name.clone()))?;
        let header_value = HeaderValue::from_str(&text)
            .map_err(|_| ChallengeExecutionError::InvalidHeader(name.clone()))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

fn invalid_field(
    field: &'static str,
    expected: &'static str,
    found: &Value,
) -> ChallengeExecutionError {
    ChallengeExecutionError::InvalidField {
        field,
        expected,
        found: found.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    type Seen = (Method, Url, HeaderMap, RequestBody);

    #[derive(Default)]
    struct RecordingClient {
        seen: Mutex<Vec<Seen>>,
    }

    impl RecordingClient {
        fn record(
            &self,
            method: &Method,
            url: &Url,
            headers: &HeaderMap,
            body: RequestBody,
        ) -> ChallengeHttpResponse {
            self.seen
                .lock()
                .unwrap()
                .push((method.clone(), url.clone(), headers.clone(), body));
            ChallengeHttpResponse {
                status: 200,
                headers: HeaderMap::new(),
                body: br#"{"cookie":"datadome=XYZ; Max-Age=31536000"}"#.to_vec(),
                url: url.clone(),
            }
        }
    }

    #[async_trait]
    impl ChallengeHttpClient for RecordingClient {
        async fn send_form(
            &self,
            method: &Method,
            url: &Url,
            headers: &HeaderMap,
            form_fields: &HashMap<String, String>,
        ) -> Result<ChallengeHttpResponse, ChallengeHttpClientError> {
            Ok(self.record(method, url, headers, RequestBody::Form(form_fields.clone())))
        }

        async fn send_body(
            &self,
            method: &Method,
            url: &Url,
            headers: &HeaderMap,
            body: Vec<u8>,
        ) -> Result<ChallengeHttpResponse, ChallengeHttpClientError> {
            Ok(self.record(method, url, headers, RequestBody::Raw(body)))
        }
    }

    fn request_from(reply: Value) -> CookieRequest {
        serde_json::from_value(reply).unwrap()
    }

    #[tokio::test]
    async fn posts_payload_with_headers() {
        let client = RecordingClient::default();
        let request = CookieRequest::new("https://geo.captcha-delivery.com/captcha/check")
            .insert_payload("cid", "abc")
            .insert_header("Referer", "https://geo.captcha-delivery.com/");

        let response = submit_cookie_request(&client, &request).await.unwrap();
        assert_eq!(response.status, 200);
        assert!(response.text().contains("datadome=XYZ"));

        let seen = client.seen.lock().unwrap();
        let (method, url, headers, body) = &seen[0];
        assert_eq!(method, &Method::POST);
        assert_eq!(url.as_str(), "https://geo.captcha-delivery.com/captcha/check");
        assert_eq!(headers.get("referer").unwrap(), "https://geo.captcha-delivery.com/");
        assert_eq!(
            body,
            &RequestBody::Form(HashMap::from([("cid".to_string(), "abc".to_string())]))
        );
    }

    #[tokio::test]
    async fn non_string_payload_values_become_json_text() {
        let client = RecordingClient::default();
        let request = request_from(json!({
            "url": "https://api-js.datadome.co/js/",
            "payload": {
                "ddk": 12,
                "ddv": "4.1.0",
                "flag": true,
                "opts": {"a": [1, 2]},
                "none": null,
            },
            "headers": {"X-Count": 3},
        }));

        submit_cookie_request(&client, &request).await.unwrap();

        let seen = client.seen.lock().unwrap();
        let (_, _, headers, body) = &seen[0];
        assert_eq!(headers.get("x-count").unwrap(), "3");
        let RequestBody::Form(fields) = body else {
            panic!("expected a form body, got {body:?}");
        };
        assert_eq!(fields["ddk"], "12");
        assert_eq!(fields["ddv"], "4.1.0");
        assert_eq!(fields["flag"], "true");
        assert_eq!(fields["opts"], r#"{"a":[1,2]}"#);
        assert_eq!(fields["none"], "");
    }

    #[tokio::test]
    async fn string_payload_is_sent_verbatim() {
        let client = RecordingClient::default();
        let request = request_from(json!({
            "url": "https://geo.captcha-delivery.com/captcha/check",
            "payload": "cid=abc&icid=def",
            "headers": {"Content-Type": "application/x-www-form-urlencoded"},
        }));

        submit_cookie_request(&client, &request).await.unwrap();

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen[0].3, RequestBody::Raw(b"cid=abc&icid=def".to_vec()));
    }

    #[tokio::test]
    async fn missing_payload_sends_empty_form() {
        let client = RecordingClient::default();
        submit_cookie_request(&client, &CookieRequest::new("https://example.com/js/"))
            .await
            .unwrap();
        assert_eq!(client.seen.lock().unwrap()[0].3, RequestBody::Form(HashMap::new()));
    }

    #[tokio::test]
    async fn bad_shapes_are_reported_before_sending() {
        let client = RecordingClient::default();

        let err = submit_cookie_request(&client, &request_from(json!({"url": null})))
            .await
            .expect_err("null url must fail");
        assert!(matches!(err, ChallengeExecutionError::MissingField("url")));

        let err = submit_cookie_request(&client, &request_from(json!({"url": 5})))
            .await
            .expect_err("numeric url must fail");
        assert!(matches!(err, ChallengeExecutionError::InvalidField { field: "url", .. }));

        let err = submit_cookie_request(
            &client,
            &request_from(json!({"url": "https://example.com/", "payload": [1, 2]})),
        )
        .await
        .expect_err("array payload must fail");
        match err {
            ChallengeExecutionError::InvalidField { field, found, .. } => {
                assert_eq!(field, "payload");
                assert_eq!(found, "[1,2]");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = submit_cookie_request(
            &client,
            &request_from(json!({"url": "https://example.com/", "headers": "Referer: x"})),
        )
        .await
        .expect_err("string headers must fail");
        assert!(matches!(err, ChallengeExecutionError::InvalidField { field: "headers", .. }));

        assert!(client.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_relative_url() {
        let client = RecordingClient::default();
        let err = submit_cookie_request(&client, &CookieRequest::new("/captcha/check"))
            .await
            .expect_err("relative url must fail");
        assert!(matches!(err, ChallengeExecutionError::InvalidUrl(..)));
        assert!(client.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_invalid_header_name() {
        let client = RecordingClient::default();
        let request = CookieRequest::new("https://example.com/").insert_header("bad header", "x");
        let err = submit_cookie_request(&client, &request)
            .await
            .expect_err("invalid header must fail");
        assert!(matches!(
            err,
            ChallengeExecutionError::InvalidHeader(name) if name == "bad header"
        ));
    }
}
