//! Settings and configuration module
//!
//! Provides the solver configuration with:
//! - Builder pattern
//! - Environment and JSON loading
//! - Sensible defaults for the TakionAPI endpoint and user agent

pub mod solver;

pub use solver::{
    API_KEY_ENV, BASE_URL_ENV, ConfigError, DEFAULT_BASE_URL, SolverConfig, SolverConfigBuilder,
};
