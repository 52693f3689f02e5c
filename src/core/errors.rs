//! Custom error types for Zaban API operations

use thiserror::Error;

/// Errors produced by the Zaban client
#[derive(Error, Debug)]
pub enum ZabanError {
    /// Malformed input caught before dispatch
    #[error("Validation error: {message}")]
    Validation {
        message: String,
    },

    /// Credential rejected by the service
    #[error("Authentication error: {message}")]
    Authentication {
        message: String,
    },

    /// Network or timeout failure
    #[error("Transport error: {message}")]
    Transport {
        message: String,
    },

    /// Non-success response from the API
    #[error("API error: {status} - {message}")]
    Api {
        status: u16,
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for ZabanError {
    fn from(err: reqwest::Error) -> Self {
        ZabanError::Transport {
            message: err.to_string(),
        }
    }
}

/// Result type for Zaban operations
pub type Result<T> = std::result::Result<T, ZabanError>;
