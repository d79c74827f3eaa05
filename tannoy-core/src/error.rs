//! Error types shared across the Tannoy crates.

use crate::protocol::ProtocolError;
use thiserror::Error;

/// Main error type for Tannoy operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Wire protocol violation (malformed frame, bad encoding).
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Network-level failure (bind, dial, read, write).
    #[error("network error: {0}")]
    Network(String),

    /// Invalid configuration supplied at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Tannoy operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a network error with a message.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Create a configuration error with a message.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}
