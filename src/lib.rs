//! # datadome-rs
//!
//! DataDome challenge detection and cookie solving for Rust HTTP clients,
//! backed by the TakionAPI solving service.
//!
//! The crate does not solve anything locally. It recognises a DataDome
//! challenge page, hands the challenge artifacts to the remote service and
//! replays the cookie-minting request the service describes. Retries,
//! backoff and proxy rotation are left to the caller.
//!
//! ## Features
//!
//! - Heuristic DataDome challenge detection
//! - Typed client for the build-url and solve endpoints
//! - Distinct error for banned egress IPs
//! - Optional high level scraper with a shared cookie jar
//!
//! ## Example
//!
//! ```no_run
//! use datadome_rs::DataDomeScraper;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scraper = DataDomeScraper::new("TAKION_API_XXXXXXXXXX")?;
//!     let response = scraper
//!         .get("https://www.footlocker.pt/en/product/~/314206535404.html")
//!         .await?;
//!     println!("Response: {}", response.status());
//!     Ok(())
//! }
//! ```
//!
//! Driving the flow by hand with your own session:
//!
//! ```no_run
//! use datadome_rs::{ChallengeDetector, ChallengeResponse, DataDomeSolver};
//!
//! # async fn flow(
//! #     page: ChallengeResponse<'_>,
//! #     challenge: ChallengeResponse<'_>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let mut solver = DataDomeSolver::new("TAKION_API_XXXXXXXXXX")?;
//! if ChallengeDetector::is_challenge(&page) {
//!     let url = solver
//!         .get_challenge_url(page.url.as_str(), &page, None, None)
//!         .await?;
//!     // load `url` with the same session, then:
//!     let request = solver.solve_challenge(&challenge, None, None).await?;
//!     // hand `request` to `submit_cookie_request` (or POST its `payload()`
//!     // to its `url()` yourself) and feed the reply to
//!     // `ChallengeDetector::extract_cookie`.
//!     # let _ = (url, request);
//! }
//! # Ok(())
//! # }
//! ```

mod scraper;

pub mod challenges;
pub mod config;
pub mod external_deps;
pub mod modules;

pub use crate::scraper::{
    DataDomeScraper,
    DataDomeScraperBuilder,
    ScraperError,
    ScraperResponse,
    ScraperResult,
};

pub use crate::challenges::core::{
    ChallengeExecutionError,
    ChallengeHttpClient,
    ChallengeHttpClientError,
    ChallengeHttpResponse,
    ChallengeResponse,
    CookieRequest,
    DataDomeError,
    DataDomeResult,
    ReqwestChallengeHttpClient,
    submit_cookie_request,
};

pub use crate::challenges::detectors::{
    ChallengeDetection,
    ChallengeDetector,
    ChallengeIndicator,
};

pub use crate::challenges::solvers::{
    ChallengeState,
    ChallengeType,
    DataDomeSolver,
};

pub use crate::challenges::user_agents::{
    BrowserProfile,
    DEFAULT_USER_AGENT,
    UserAgentError,
};

pub use crate::config::{
    ConfigError,
    SolverConfig,
    SolverConfigBuilder,
};

pub use crate::external_deps::takion::{
    TakionClient,
    TakionError,
};

pub use crate::modules::{
    ChallengeEvent,
    ChallengeStage,
    ErrorEvent,
    EventDispatcher,
    EventHandler,
    LoggingHandler,
    PostResponseEvent,
    ScraperEvent,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
