use std::time::Duration;
use thiserror::Error;

/// Error type for drng operations
#[derive(Error, Debug)]
pub enum DrngError {
    /// Conflicting or malformed options, detected before any network work
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No endpoint yielded valid chain info
    #[error("Resolution error: {0}")]
    Resolution(String),

    /// Randomness fetch for the selected round failed
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// KDF could not produce the seed
    #[error("Derivation error: {0}")]
    Derivation(String),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Parsing errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// The initialization deadline expired
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

pub type Result<T> = std::result::Result<T, DrngError>;

impl From<reqwest::Error> for DrngError {
    fn from(error: reqwest::Error) -> Self {
        DrngError::Http(error.to_string())
    }
}

impl From<serde_json::Error> for DrngError {
    fn from(error: serde_json::Error) -> Self {
        DrngError::Parse(error.to_string())
    }
}

impl From<hex::FromHexError> for DrngError {
    fn from(error: hex::FromHexError) -> Self {
        DrngError::InvalidInput(format!("malformed hex: {}", error))
    }
}

impl From<url::ParseError> for DrngError {
    fn from(error: url::ParseError) -> Self {
        DrngError::InvalidInput(format!("malformed URL: {}", error))
    }
}

impl DrngError {
    /// Whether the error was raised before any network or derivation work.
    pub fn is_config(&self) -> bool {
        matches!(self, DrngError::Config(_) | DrngError::InvalidInput(_))
    }
}
