use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for the guard
#[derive(Error, Debug)]
pub enum GuardError {
    // Input errors
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("No proxy input given")]
    MissingInput,

    // Check errors
    #[error("Proxy connection failed: {0}")]
    ProxyConnectionFailed(String),

    #[error("Traffic check failed: {0}")]
    TrafficCheckFailed(String),

    #[error("Reputation lookup failed: {0}")]
    ReputationUnavailable(String),

    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("Operation timed out")]
    Timeout,

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for guard operations
pub type Result<T> = std::result::Result<T, GuardError>;

impl From<tokio_socks::Error> for GuardError {
    fn from(err: tokio_socks::Error) -> Self {
        GuardError::ProxyConnectionFailed(format!("SOCKS5 connect failed: {}", err))
    }
}
