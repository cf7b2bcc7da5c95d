//! Error types for the wire protocol

use std::io;
use thiserror::Error;

/// Errors that can occur while encoding, decoding or framing messages
#[derive(Error, Debug)]
pub enum ProtoError {
    /// I/O error (socket operations)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed frame (truncated body, bad UTF-8, unknown tag)
    #[error("protocol error: {0}")]
    Malformed(String),

    /// Frame exceeds the maximum accepted size
    #[error("frame too large: {len} bytes (max {max})")]
    FrameTooLarge { len: u32, max: u32 },
}

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtoError>;
