//! Tailpipe wire protocol
//!
//! Defines the frames exchanged between the relay, agents (file providers)
//! and tail clients (consumers), plus the framing layer shared by all three.
//!
//! # Wire Format
//!
//! All frames are length-prefixed:
//! ```text
//! ┌──────────────┬─────────────────────────────────────┐
//! │ 4 bytes      │ N bytes                             │
//! │ length (BE)  │ payload                             │
//! └──────────────┴─────────────────────────────────────┘
//! ```
//!
//! The first payload byte is the frame tag, followed by the frame body.
//! Strings are u32-length-prefixed UTF-8.

mod error;
mod frame;
mod reader;

pub use error::{ProtoError, Result};
pub use frame::{Frame, Line, TailCall, TailRequest};
pub use reader::{FrameReader, write_frame};

/// Maximum accepted frame payload size (1 MiB)
pub const MAX_FRAME_SIZE: u32 = 1024 * 1024;

/// Longest line text that fits in one `Line` frame
///
/// Leaves headroom under [`MAX_FRAME_SIZE`] for the tag, correlation key
/// and length fields. Senders must split longer file lines across frames.
pub const MAX_LINE_LEN: usize = MAX_FRAME_SIZE as usize - 256;
