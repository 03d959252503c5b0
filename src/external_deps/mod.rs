//! Third-party service integrations.
//!
//! Hosts the client for the remote DataDome solving service so the challenge
//! layer stays independent of its wire format.

pub mod takion;
