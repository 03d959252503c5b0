//! High level scraper orchestration.
//!
//! Wires the detector, the solver and the cookie request executor to a
//! cookie-jar backed reqwest client. A request that hits a DataDome challenge
//! goes through the full flow exactly once: build the challenge URL, load it,
//! solve it, mint the `datadome` cookie, store it and load the page again.
//! Nothing is retried.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::{HeaderMap, Method};
use reqwest::cookie::{CookieStore, Jar};
use thiserror::Error;
use url::Url;

use crate::challenges::core::{
	ChallengeExecutionError, ChallengeResponse, DATADOME_COOKIE, DataDomeError,
	ReqwestChallengeHttpClient, datadome_cookie_from_header, submit_cookie_request,
};
use crate::challenges::detectors::{ChallengeDetection, ChallengeDetector};
use crate::challenges::solvers::{ChallengeType, DataDomeSolver};
use crate::challenges::user_agents::{BrowserProfile, UserAgentError};
use crate::config::{ConfigError, SolverConfig, SolverConfigBuilder};
use crate::external_deps::takion::TakionClient;
use crate::modules::events::{
	ChallengeEvent, ChallengeStage, ErrorEvent, EventDispatcher, EventHandler, LoggingHandler,
	PostResponseEvent, ScraperEvent,
};

/// Result alias used across the orchestration layer.
pub type ScraperResult<T> = Result<T, ScraperError>;

/// High-level error surfaced by the scraper.
#[derive(Debug, Error)]
pub enum ScraperError {
	#[error("http error: {0}")]
	Http(#[from] reqwest::Error),
	#[error("url parse error: {0}")]
	Url(#[from] url::ParseError),
	#[error("header profile error: {0}")]
	UserAgent(#[from] UserAgentError),
	#[error("cookie request failed: {0}")]
	ChallengeExecution(#[from] ChallengeExecutionError),
	#[error("challenge solving failed: {0}")]
	DataDome(#[from] DataDomeError),
	#[error("configuration error: {0}")]
	Config(#[from] ConfigError),
	#[error("utf8 conversion failed: {0}")]
	Utf8(#[from] std::string::FromUtf8Error),
}

impl ScraperError {
	/// `true` when the solving service reported the egress IP as banned.
	pub fn is_ip_banned(&self) -> bool {
		matches!(self, ScraperError::DataDome(err) if err.is_ip_banned())
	}
}

/// Read-only HTTP response returned by the scraper.
#[derive(Debug, Clone)]
pub struct ScraperResponse {
	status: u16,
	headers: HeaderMap,
	body: Bytes,
	url: Url,
	solved_challenge: bool,
}

impl ScraperResponse {
	fn new(status: u16, headers: HeaderMap, body: Bytes, url: Url) -> Self {
		Self {
			status,
			headers,
			body,
			url,
			solved_challenge: false,
		}
	}

	/// HTTP status code as returned by the target origin.
	pub fn status(&self) -> u16 {
		self.status
	}

	/// Final URL after redirects.
	pub fn url(&self) -> &Url {
		&self.url
	}

	/// Response headers.
	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	/// `true` when a DataDome challenge was solved to obtain this response.
	pub fn solved_challenge(&self) -> bool {
		self.solved_challenge
	}

	/// Convenience helper returning the body as UTF-8 text.
	pub fn text(&self) -> ScraperResult<String> {
		Ok(String::from_utf8(self.body.to_vec())?)
	}

	/// Raw body bytes.
	pub fn bytes(&self) -> Bytes {
		self.body.clone()
	}

	fn lossy_text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	fn as_challenge_response<'a>(&'a self, body: &'a str) -> ChallengeResponse<'a> {
		ChallengeResponse {
			url: &self.url,
			status: self.status,
			headers: &self.headers,
			body,
		}
	}
}

/// Fluent builder for [`DataDomeScraper`].
#[derive(Default)]
pub struct DataDomeScraperBuilder {
	solver: SolverConfigBuilder,
	user_agent: Option<String>,
	timeout: Option<Duration>,
	handlers: Vec<Arc<dyn EventHandler>>,
	disable_logging: bool,
}

impl DataDomeScraperBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
		self.solver = self.solver.api_key(api_key);
		self
	}

	/// Point the solver at another deployment of the solving service.
	pub fn with_solver_base_url(mut self, base_url: impl Into<String>) -> Self {
		self.solver = self.solver.base_url(base_url);
		self
	}

	/// User agent for page loads and for the solving service.
	pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = Some(user_agent.into());
		self
	}

	/// Timeout applied to every HTTP request, off by default.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);
		self
	}

	pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
		self.handlers.push(handler);
		self
	}

	pub fn disable_logging(mut self) -> Self {
		self.disable_logging = true;
		self
	}

	pub fn build(self) -> ScraperResult<DataDomeScraper> {
		let mut solver = self.solver;
		if let Some(ref user_agent) = self.user_agent {
			solver = solver.user_agent(user_agent.clone());
		}
		if let Some(timeout) = self.timeout {
			solver = solver.timeout(timeout);
		}
		let config = solver.build()?;

		let mut events = EventDispatcher::new();
		if !self.disable_logging {
			events.register_handler(Arc::new(LoggingHandler));
		}
		for handler in self.handlers {
			events.register_handler(handler);
		}

		DataDomeScraper::with_config(config, events)
	}
}

/// Async HTTP client that clears DataDome challenges on the way.
pub struct DataDomeScraper {
	client: reqwest::Client,
	jar: Arc<Jar>,
	takion: TakionClient,
	challenge_client: ReqwestChallengeHttpClient,
	profile: BrowserProfile,
	events: Arc<EventDispatcher>,
}

impl DataDomeScraper {
	/// Construct a scraper with default settings for the given API key.
	pub fn new(api_key: impl Into<String>) -> ScraperResult<Self> {
		DataDomeScraper::builder().with_api_key(api_key).build()
	}

	/// Obtain a builder to customise the scraper instance.
	pub fn builder() -> DataDomeScraperBuilder {
		DataDomeScraperBuilder::new()
	}

	fn with_config(config: SolverConfig, events: EventDispatcher) -> ScraperResult<Self> {
		let jar = Arc::new(Jar::default());
		let mut builder = reqwest::Client::builder().cookie_provider(jar.clone());
		if let Some(timeout) = config.timeout {
			builder = builder.timeout(timeout);
		}
		let client = builder.build()?;

		Ok(Self {
			takion: TakionClient::new(&config)?,
			challenge_client: ReqwestChallengeHttpClient::from_client(client.clone()),
			profile: BrowserProfile::new(config.user_agent),
			client,
			jar,
			events: Arc::new(events),
		})
	}

	/// Current `datadome` cookie held for `url`.
	pub fn cookie(&self, url: &Url) -> Option<String> {
		let header = self.jar.cookies(url)?;
		let header = header.to_str().ok()?;
		datadome_cookie_from_header(header).map(str::to_string)
	}

	/// Store a `datadome` cookie for `url`, e.g. one minted earlier.
	pub fn set_cookie(&self, url: &Url, value: &str) {
		self.jar
			.add_cookie_str(&format!("{DATADOME_COOKIE}={value}; Path=/"), url);
	}

	/// Perform an HTTP GET request, solving a DataDome challenge if one is
	/// served.
	pub async fn get(&self, url: &str) -> ScraperResult<ScraperResponse> {
		let url = Url::parse(url)?;
		let first = self.load_page(&url).await?;

		let body = first.lossy_text();
		let Some(detection) = ChallengeDetector::detect(&first.as_challenge_response(&body)) else {
			return Ok(first);
		};

		let domain = url.host_str().unwrap_or_default().to_string();
		self.emit_stage(&domain, ChallengeStage::Detected, detection.hinted_type);

		if let Err(err) = self.clear_challenge(&url, &first, &body, &detection).await {
			self.events.dispatch(ScraperEvent::Error(ErrorEvent {
				domain,
				error: err.to_string(),
				ip_banned: err.is_ip_banned(),
				timestamp: chrono::Utc::now(),
			}));
			return Err(err);
		}

		let mut response = self.load_page(&url).await?;
		response.solved_challenge = true;
		Ok(response)
	}

	async fn clear_challenge(
		&self,
		url: &Url,
		blocked: &ScraperResponse,
		blocked_body: &str,
		detection: &ChallengeDetection,
	) -> ScraperResult<()> {
		let domain = url.host_str().unwrap_or_default();
		let mut solver = DataDomeSolver::from_client(self.takion.clone(), self.profile.user_agent());

		let current = self.cookie(url);
		let challenge_url = solver
			.get_challenge_url(
				url.as_str(),
				&blocked.as_challenge_response(blocked_body),
				current.as_deref(),
				None,
			)
			.await?;
		self.emit_stage(domain, ChallengeStage::UrlBuilt, solver.state().known());

		let challenge_url = Url::parse(&challenge_url)?;
		let challenge_page = self
			.fetch(&challenge_url, self.profile.challenge_headers(url)?)
			.await?;
		let challenge_body = challenge_page.lossy_text();

		let request = solver
			.solve_challenge(
				&challenge_page.as_challenge_response(&challenge_body),
				None,
				detection.hinted_type,
			)
			.await?;
		let solved_type: Option<ChallengeType> = solver.state().known();
		self.emit_stage(domain, ChallengeStage::Solved, solved_type);

		let minted = submit_cookie_request(&self.challenge_client, &request).await?;
		let minted_body = minted.text();
		let cookie = ChallengeDetector::extract_cookie(&minted.as_challenge_response(&minted_body))?;
		self.set_cookie(url, &cookie);
		self.emit_stage(domain, ChallengeStage::CookieMinted, solved_type);

		Ok(())
	}

	async fn load_page(&self, url: &Url) -> ScraperResult<ScraperResponse> {
		self.fetch(url, self.profile.navigation_headers()?).await
	}

	async fn fetch(&self, url: &Url, headers: HeaderMap) -> ScraperResult<ScraperResponse> {
		let started = Instant::now();
		let resp = self.client.get(url.clone()).headers(headers).send().await?;

		let status = resp.status().as_u16();
		let headers = resp.headers().clone();
		let final_url = resp.url().clone();
		let body = resp.bytes().await?;

		self.events.dispatch(ScraperEvent::PostResponse(PostResponseEvent {
			url: final_url.clone(),
			method: Method::GET,
			status,
			latency: started.elapsed(),
			timestamp: chrono::Utc::now(),
		}));

		Ok(ScraperResponse::new(status, headers, body, final_url))
	}

	fn emit_stage(&self, domain: &str, stage: ChallengeStage, challenge_type: Option<ChallengeType>) {
		self.events.dispatch(ScraperEvent::Challenge(ChallengeEvent {
			domain: domain.to_string(),
			stage,
			challenge_type,
			timestamp: chrono::Utc::now(),
		}));
	}
}
