//! Server error types

use thiserror::Error;

/// Errors that can occur in the parley server
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to the specified address
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration the server cannot run with
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Listener I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
