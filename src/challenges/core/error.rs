//! Error taxonomy surfaced by the detector and the solver.

use thiserror::Error;

use crate::config::ConfigError;

/// Boxed cause attached to collapsed transport/decode failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used by the detection and solving layers.
pub type DataDomeResult<T> = Result<T, DataDomeError>;

/// Remote error text reporting that the caller's egress IP is banned.
pub const IP_BANNED_MESSAGE: &str = "Ip banned";

#[derive(Debug, Error)]
pub enum DataDomeError {
    /// The solving service (or the cookie endpoint) answered with something
    /// this crate cannot use, or could not be reached at all.
    #[error("bad response: {message}")]
    BadResponse {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
    /// The solving service reported the caller's IP as banned.
    #[error("ip banned: {0}")]
    IpBanned(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

impl DataDomeError {
    pub fn bad_response(message: impl Into<String>) -> Self {
        Self::BadResponse {
            message: message.into(),
            source: None,
        }
    }

    pub fn bad_response_with(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::BadResponse {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Human-readable message carried by the error, without the kind prefix.
    pub fn message(&self) -> String {
        match self {
            Self::BadResponse { message, .. } => message.clone(),
            Self::IpBanned(message) | Self::InvalidArgument(message) => message.clone(),
            Self::Configuration(err) => err.to_string(),
        }
    }

    pub fn is_ip_banned(&self) -> bool {
        matches!(self, Self::IpBanned(_))
    }
}
