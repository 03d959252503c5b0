//! Challenge solver module.
//!
//! Holds the closed set of DataDome challenge variants understood by the
//! solving service and the per-flow state that remembers which one applies.

pub mod datadome;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::challenges::core::DataDomeError;

pub use datadome::DataDomeSolver;

/// Challenge variants the solving service can handle. The wire name doubles
/// as the solve endpoint name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeType {
    Interstitial,
    Geetest,
}

impl ChallengeType {
    pub const ALL: [ChallengeType; 2] = [ChallengeType::Interstitial, ChallengeType::Geetest];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeType::Interstitial => "interstitial",
            ChallengeType::Geetest => "geetest",
        }
    }
}

impl fmt::Display for ChallengeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChallengeType {
    type Err = DataDomeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ChallengeType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| {
                DataDomeError::InvalidArgument(format!("unknown challenge type '{value}'"))
            })
    }
}

/// Which solve endpoint a challenge flow targets.
///
/// Moves out of `Unset` at most once per flow and never returns to it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChallengeState {
    #[default]
    Unset,
    Known(ChallengeType),
    /// The service named a type this crate does not know. Kept verbatim so
    /// the solve step can report it.
    Unrecognized(String),
}

impl ChallengeState {
    /// State recorded from the `challenge_type` field of a build-url reply.
    pub fn from_remote(value: &str) -> Self {
        value
            .parse::<ChallengeType>()
            .map(ChallengeState::Known)
            .unwrap_or_else(|_| ChallengeState::Unrecognized(value.to_string()))
    }

    /// Like [`ChallengeState::from_remote`] for an undecoded field. `null`
    /// records nothing; a non-string value is kept as its JSON text.
    pub fn from_remote_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(raw) => Some(Self::from_remote(raw)),
            other => Some(ChallengeState::Unrecognized(other.to_string())),
        }
    }

    pub fn known(&self) -> Option<ChallengeType> {
        match self {
            ChallengeState::Known(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, ChallengeState::Unset)
    }
}
