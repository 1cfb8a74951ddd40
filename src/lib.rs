//! # Interview Relay Library
//!
//! Brokers single-use speech-to-text relay tokens for mock interview
//! sessions, bridges browser WebSockets to the transcription provider, and
//! passes room/recording calls through to the recording provider.
//!
//! Modules:
//! - `config`: service configuration, loading and validation
//! - `cache`: in-memory token store
//! - `broker`: token issuance and expiry sweep
//! - `relay`: WebSocket relay sessions and the upstream connector
//! - `recording`: recording provider client and pass-through routes
//! - `server`: application state, router and shared-secret guard

pub mod broker;
pub mod cache;
pub mod config;
pub mod error;
pub mod helpers;
pub mod observability;
pub mod recording;
pub mod relay;
pub mod server;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::config::types::ServiceConfig;
pub use crate::error::{RelayError, Result};
