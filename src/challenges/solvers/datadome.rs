//! DataDome challenge orchestration backed by the TakionAPI solving service.
//!
//! A solver instance drives one challenge flow:
//! 1. [`DataDomeSolver::get_challenge_url`] sends the blocked page to the
//!    service, which answers with the challenge URL and its type.
//! 2. The caller loads that URL with its own session.
//! 3. [`DataDomeSolver::solve_challenge`] sends the challenge page to the
//!    endpoint for the recorded type and returns the [`CookieRequest`] the
//!    caller must issue to mint the `datadome` cookie.
//!
//! The recorded type lives on the instance, so use one solver per in-flight
//! challenge.

use crate::challenges::core::{
    ChallengeResponse, CookieRequest, DataDomeError, DataDomeResult, IP_BANNED_MESSAGE,
};
use crate::config::SolverConfig;
use crate::external_deps::takion::{
    BuildUrlRequest, SolveRequest, TakionClient, remote_error_message,
};

use super::{ChallengeState, ChallengeType};

const BUILD_URL_FAILED: &str = "Could not parse challenge URL from response";
const SOLVE_FAILED: &str = "Could not solve challenge";
const TYPE_NOT_SET: &str = "Challenge type not set";

/// Stateful client for a single DataDome challenge flow.
#[derive(Debug, Clone)]
pub struct DataDomeSolver {
    client: TakionClient,
    user_agent: String,
    state: ChallengeState,
}

impl DataDomeSolver {
    /// Solver against the public service using the given API key.
    pub fn new(api_key: impl Into<String>) -> DataDomeResult<Self> {
        Self::with_config(SolverConfig::new(api_key))
    }

    pub fn with_config(config: SolverConfig) -> DataDomeResult<Self> {
        let client = TakionClient::new(&config)?;
        Ok(Self::from_client(client, config.user_agent))
    }

    /// Wrap a pre-built wire client. `user_agent` is used whenever a call does
    /// not supply its own.
    pub fn from_client(client: TakionClient, user_agent: impl Into<String>) -> Self {
        Self {
            client,
            user_agent: user_agent.into(),
            state: ChallengeState::Unset,
        }
    }

    pub fn state(&self) -> &ChallengeState {
        &self.state
    }

    /// Establish the challenge type without a build-url round trip.
    pub fn set_challenge_type(&mut self, challenge_type: ChallengeType) {
        self.state = ChallengeState::Known(challenge_type);
    }

    /// Ask the service for the challenge URL of a blocked page.
    ///
    /// `original_url` is the page that returned the challenge, `response` the
    /// blocked response and `cookie` the `datadome` cookie currently held by
    /// the session, if any. On success the reply's `challenge_type` is
    /// recorded for the solve step, recognized or not.
    pub async fn get_challenge_url(
        &mut self,
        original_url: &str,
        response: &ChallengeResponse<'_>,
        cookie: Option<&str>,
        user_agent: Option<&str>,
    ) -> DataDomeResult<String> {
        let user_agent = user_agent.unwrap_or(&self.user_agent);
        let request = BuildUrlRequest {
            html: response.body,
            cid: cookie,
            referrer: original_url,
        };

        let reply = self
            .client
            .build_url(&request, user_agent)
            .await
            .map_err(|err| DataDomeError::bad_response_with(BUILD_URL_FAILED, err))?;

        let url = match reply.challenge_url() {
            Some(url) => url.to_string(),
            None => {
                let message = reply.error_message().unwrap_or_default();
                log::debug!("build-url returned no url: {:?}", message);
                return Err(DataDomeError::bad_response(message));
            }
        };

        if let Some(state) = reply
            .challenge_type
            .as_ref()
            .and_then(ChallengeState::from_remote_value)
        {
            if let ChallengeState::Unrecognized(raw) = &state {
                log::warn!("solving service returned unknown challenge type '{}'", raw);
            }
            self.state = state;
        }

        log::debug!("challenge url built ({:?})", self.state);
        Ok(url)
    }

    /// Submit the loaded challenge page and get back the cookie request.
    ///
    /// The type recorded by [`DataDomeSolver::get_challenge_url`] wins; the
    /// override only applies while no known type is recorded, and is then
    /// adopted for later calls.
    pub async fn solve_challenge(
        &mut self,
        response: &ChallengeResponse<'_>,
        user_agent: Option<&str>,
        challenge_type: Option<ChallengeType>,
    ) -> DataDomeResult<CookieRequest> {
        let challenge_type = self.effective_type(challenge_type)?;
        let user_agent = user_agent.unwrap_or(&self.user_agent);

        let reply = self
            .client
            .solve(
                challenge_type.as_str(),
                &SolveRequest {
                    html: response.body,
                },
                user_agent,
            )
            .await
            .map_err(|err| DataDomeError::bad_response_with(SOLVE_FAILED, err))?;

        if let Some(message) = reply.get("error").and_then(remote_error_message) {
            if message == IP_BANNED_MESSAGE {
                log::warn!("solving service reports the egress ip as banned");
                return Err(DataDomeError::IpBanned(message));
            }
            return Err(DataDomeError::bad_response(message));
        }

        let request = CookieRequest::from_reply(reply);
        log::info!(
            "{} challenge solved, cookie endpoint {}",
            challenge_type,
            request.url().unwrap_or("<missing>")
        );
        Ok(request)
    }

    fn effective_type(
        &mut self,
        requested: Option<ChallengeType>,
    ) -> DataDomeResult<ChallengeType> {
        if let Some(kind) = self.state.known() {
            return Ok(kind);
        }
        if let Some(kind) = requested {
            self.state = ChallengeState::Known(kind);
            return Ok(kind);
        }
        match &self.state {
            ChallengeState::Unrecognized(raw) => Err(DataDomeError::bad_response(format!(
                "Unsupported challenge type '{raw}'"
            ))),
            _ => Err(DataDomeError::InvalidArgument(TYPE_NOT_SET.to_string())),
        }
    }
}
