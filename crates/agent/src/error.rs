//! Error types for the agent

use std::io;
use thiserror::Error;

use tailpipe_proto::ProtoError;

/// Errors that can occur in the agent
#[derive(Error, Debug)]
pub enum AgentError {
    /// I/O error (socket or file operations)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Wire protocol violation
    #[error(transparent)]
    Protocol(#[from] ProtoError),

    /// The relay closed the connection
    #[error("relay connection closed")]
    RelayClosed,
}

/// Result type for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;
