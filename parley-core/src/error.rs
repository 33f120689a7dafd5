//! Error types for parley-core

use thiserror::Error;
use tokio_util::codec::LinesCodecError;

use crate::session::SessionId;

/// Top-level error type for parley-core
#[derive(Error, Debug)]
pub enum ParleyError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Routing error: {0}")]
    Routing(#[from] RoutingError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// A frame or command that could not be interpreted.
///
/// Recoverable: the session gets an instructional reply and stays connected.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    MalformedFrame(#[from] serde_json::Error),

    #[error("Usage: /connect <client_id>")]
    ConnectUsage,
}

/// A directed delivery that could not reach its target.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RoutingError {
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("outbound queue of session {0} is full")]
    QueueFull(SessionId),

    #[error("message names no recipient")]
    NoRecipient,
}

/// Failures of the underlying connection. Fatal to the affected session only.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame exceeds the maximum length")]
    FrameTooLong,

    #[error("failed to encode frame: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("write timed out after {0:?}")]
    WriteTimeout(std::time::Duration),

    #[error("outbound queue is full")]
    Saturated,

    #[error("transport closed")]
    Closed,
}

impl From<LinesCodecError> for TransportError {
    fn from(err: LinesCodecError) -> Self {
        match err {
            LinesCodecError::MaxLineLengthExceeded => TransportError::FrameTooLong,
            LinesCodecError::Io(e) => TransportError::Io(e),
        }
    }
}

/// Result alias used across parley-core
pub type ParleyResult<T> = Result<T, ParleyError>;
