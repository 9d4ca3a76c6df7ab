//! Client errors

use thiserror::Error;

/// Errors that can occur while talking to the telemetry backend
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{endpoint} returned HTTP {status}")]
    UnexpectedStatus { endpoint: &'static str, status: u16 },

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

impl ClientError {
    /// True when the request never produced an HTTP response.
    ///
    /// The reset command only skips its local side effects in this case.
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_) | ClientError::Unavailable(_))
    }
}

/// Errors raised while loading or validating a [`crate::config::ClientConfig`]
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
