//! Error types for the relay

use std::io;
use thiserror::Error;

use tailpipe_proto::ProtoError;

/// Errors that can occur in the relay
#[derive(Error, Debug)]
pub enum RelayError {
    /// Bad or missing consumer token
    #[error("authentication failed")]
    Authentication,

    /// No session registered under this provider name
    #[error("unknown provider: {name}")]
    UnknownProvider { name: String },

    /// The provider session has been torn down
    #[error("session closed: {name}")]
    SessionClosed { name: String },

    /// The provider's outbound request queue is full
    #[error("request queue full for provider {name}")]
    RequestQueueFull { name: String },

    /// A callback is already registered under this correlation key
    #[error("duplicate correlation key: {key}")]
    DuplicateKey { key: String },

    /// The consumer call was cancelled or its provider disappeared mid-tail
    #[error("call cancelled")]
    Cancelled,

    /// Wire protocol violation
    #[error(transparent)]
    Protocol(#[from] ProtoError),

    /// I/O error (socket operations)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;
