//! Core utilities shared by the challenge detector and solver.

pub mod analysis;
pub mod error;
pub mod executor;
pub mod reqwest_client;
pub mod types;

pub use analysis::{
    CAPTCHA_DOMAIN, DATADOME_COOKIE, DATADOME_SERVER, INTERSTITIAL_DOMAIN,
    datadome_cookie_from_header, is_datadome_response, origin_from_url,
};
pub use error::{BoxError, DataDomeError, DataDomeResult, IP_BANNED_MESSAGE};
pub use executor::{
    ChallengeExecutionError, ChallengeHttpClient, ChallengeHttpClientError, ChallengeHttpResponse,
    submit_cookie_request,
};
pub use reqwest_client::ReqwestChallengeHttpClient;
pub use types::{ChallengeResponse, CookieRequest};
