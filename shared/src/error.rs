//! Error types for the Events API Lambda functions.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while serving event requests.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Table or entity missing in storage
    #[error("Not found: {0}")]
    NotFound(String),

    /// Table service rejected the request
    #[error("Storage error: {0}")]
    Storage(String),

    /// Transport-level HTTP failure talking to the table service
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A stored record could not be turned into an event
    #[error("Invalid record: {0}")]
    Normalize(#[from] NormalizeError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::NotFound(_) => 404,
            _ => 500,
        }
    }

    /// Message safe to hand back to the caller.
    ///
    /// Configuration messages are operator-facing and exposed as-is; anything
    /// unexpected collapses to a generic message.
    pub fn public_message(&self) -> String {
        match self {
            Error::Config(message) => message.clone(),
            Error::NotFound(message) => message.clone(),
            _ => "Internal server error".to_string(),
        }
    }
}

/// Failures turning a single stored record into an [`Event`](crate::Event).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("malformed {attribute} in '{field}': {value:?}")]
    MalformedDate {
        attribute: &'static str,
        field: String,
        value: String,
    },

    #[error("{attribute} field '{field}' holds {found}, expected {expected}")]
    InvalidFieldType {
        attribute: &'static str,
        field: String,
        expected: &'static str,
        found: &'static str,
    },
}
