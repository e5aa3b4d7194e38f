//! Error taxonomy
//!
//! Parse failures of agent replies are not represented here: they are a
//! normal pipeline outcome, not a fault.

use thiserror::Error;

/// Failure of one decision round trip at the transport layer.
///
/// Always terminal for the tick that issued it; the arena moves to Error.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP {status}{}", status_detail(.body))]
    Status { status: u16, body: String },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("malformed response body: {0}")]
    Decode(String),
}

fn status_detail(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(": {body}")
    }
}

/// Configuration file could not be read or written
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io: {0}")]
    Io(#[from] std::io::Error),
    #[error("config json: {0}")]
    Json(#[from] serde_json::Error),
}

/// A match control request that the current phase refuses
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ArenaError {
    #[error("configure at least one agent before starting")]
    NoAgentConfigured,
    #[error("resolve the error before starting")]
    UnresolvedError,
    #[error("match is over; reset to play again")]
    MatchOver,
    #[error("match is not running")]
    NotRunning,
}
