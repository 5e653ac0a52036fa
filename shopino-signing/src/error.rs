// Error types for key management and request signing

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SigningError {
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Key file not found: {}", .0.display())]
    KeyNotFound(PathBuf),

    #[error("Unsupported key format: {0}")]
    KeyFormat(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Payload encoding failed: {0}")]
    Encoding(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Unexpected response status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Configuration error: {0}")]
    Config(#[from] shopino_config::ConfigError),
}

impl From<serde_json::Error> for SigningError {
    fn from(err: serde_json::Error) -> Self {
        SigningError::Encoding(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SigningError>;
