//! Reqwest-based implementation of the `ChallengeHttpClient` trait.
//!
//! Provides a thin adapter around `reqwest::Client` so the cookie-minting
//! request shares the connection pool and cookie jar of the caller's session.

use std::collections::HashMap;

use async_trait::async_trait;
use http::{HeaderMap, Method};
use reqwest::Client;
use url::Url;

use super::{
    ChallengeExecutionError, ChallengeHttpClient, ChallengeHttpClientError, ChallengeHttpResponse,
};

/// Reqwest-backed HTTP client used to mint the access cookie.
#[derive(Debug, Clone)]
pub struct ReqwestChallengeHttpClient {
    client: Client,
}

impl ReqwestChallengeHttpClient {
    /// Creates a new client with its own cookie store.
    pub fn new() -> Result<Self, ChallengeExecutionError> {
        let client = Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|err| ChallengeExecutionError::Client(err.into()))?;

        Ok(Self { client })
    }

    /// Wrap an existing reqwest client, typically the one owning the session
    /// cookie jar.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChallengeHttpClient for ReqwestChallengeHttpClient {
    async fn send_form(
        &self,
        method: &Method,
        url: &Url,
        headers: &HeaderMap,
        form_fields: &HashMap<String, String>,
    ) -> Result<ChallengeHttpResponse, ChallengeHttpClientError> {
        let response = self
            .client
            .request(method.clone(), url.as_str())
            .headers(headers.clone())
            .form(form_fields)
            .send()
            .await?;

        to_challenge_response(response).await
    }

    async fn send_body(
        &self,
        method: &Method,
        url: &Url,
        headers: &HeaderMap,
        body: Vec<u8>,
    ) -> Result<ChallengeHttpResponse, ChallengeHttpClientError> {
        let response = self
            .client
            .request(method.clone(), url.as_str())
            .headers(headers.clone())
            .body(body)
            .send()
            .await?;

        to_challenge_response(response).await
    }
}

async fn to_challenge_response(
    response: reqwest::Response,
) -> Result<ChallengeHttpResponse, ChallengeHttpClientError> {
    let status = response.status().as_u16();
    let headers = response.headers().clone();
    let url = response.url().clone();
    let body = response.bytes().await?.to_vec();

    Ok(ChallengeHttpResponse {
        status,
        headers,
        body,
        url,
    })
}
