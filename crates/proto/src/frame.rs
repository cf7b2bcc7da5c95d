//! Frame definitions and binary encoding
//!
//! # Frame Types
//!
//! - `Register` (0x01): agent → relay, present a provider name
//! - `Tail` (0x02): client → relay, request a file tail
//! - `Request` (0x03): relay → agent, forwarded tail request
//! - `Line` (0x04): agent → relay, one line tagged with its correlation key
//! - `Text` (0x05): relay → client, one line of file content
//! - `End` (0x06): relay → client, tail finished
//! - `Error` (0x07): relay → client, tail failed
//! - `Heartbeat` (0x08): relay → agent, keep-alive
//! - `Cancel` (0x09): relay → agent, abandon the tail for a correlation key

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{ProtoError, Result};

/// Frame tag discriminants
const TAG_REGISTER: u8 = 0x01;
const TAG_TAIL: u8 = 0x02;
const TAG_REQUEST: u8 = 0x03;
const TAG_LINE: u8 = 0x04;
const TAG_TEXT: u8 = 0x05;
const TAG_END: u8 = 0x06;
const TAG_ERROR: u8 = 0x07;
const TAG_HEARTBEAT: u8 = 0x08;
const TAG_CANCEL: u8 = 0x09;

/// Frames exchanged between the relay, agents and tail clients
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Agent → Relay: register as a provider under this name
    Register(String),
    /// Client → Relay: tail a file on a named provider
    Tail(TailCall),
    /// Relay → Agent: forwarded tail request
    Request(TailRequest),
    /// Agent → Relay: one line, tagged with its correlation key
    Line(Line),
    /// Relay → Client: one line of file content
    Text(String),
    /// Relay → Client: tail finished normally
    End,
    /// Relay → Client: tail failed
    Error(String),
    /// Relay → Agent: keep-alive ping
    Heartbeat,
    /// Relay → Agent: no consumer is waiting on this key anymore
    Cancel(String),
}

/// A consumer's tail call, as presented to the relay
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TailCall {
    /// Shared secret the relay verifies before anything else
    pub token: String,
    /// Provider to contact
    pub provider: String,
    /// File path on the provider
    pub path: String,
    /// Emit only the last N lines (0 = whole file)
    pub last_n: u32,
    /// Keep following the file after reaching its end
    pub follow: bool,
}

/// A tail request as forwarded to a provider
///
/// Immutable once sent; the correlation key binds every `Line` the provider
/// emits back to the consumer call that asked for it.
#[derive(Debug, Clone, PartialEq)]
pub struct TailRequest {
    /// Correlation key, echoed on every answering `Line`
    pub key: String,
    /// File path on the provider
    pub path: String,
    /// Emit only the last N lines (0 = whole file)
    pub last_n: u32,
    /// Keep following the file after reaching its end
    pub follow: bool,
}

/// One line of file content from a provider
///
/// A sequence of lines sharing a key terminates with exactly one
/// `eof = true` marker; that final line carries no text.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// Correlation key of the request this line answers
    pub key: String,
    /// Line content (empty on the EOF marker)
    pub text: String,
    /// Final line for this key
    pub eof: bool,
}

impl Line {
    /// A content line for the given key
    pub fn text(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
            eof: false,
        }
    }

    /// The EOF marker for the given key
    pub fn eof(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: String::new(),
            eof: true,
        }
    }
}

impl Frame {
    /// Short name for logs and error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Register(_) => "register",
            Frame::Tail(_) => "tail",
            Frame::Request(_) => "request",
            Frame::Line(_) => "line",
            Frame::Text(_) => "text",
            Frame::End => "end",
            Frame::Error(_) => "error",
            Frame::Heartbeat => "heartbeat",
            Frame::Cancel(_) => "cancel",
        }
    }

    /// Encode the frame to bytes with length prefix
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(256);

        // Reserve space for length prefix (filled in at end)
        buf.put_u32(0);

        match self {
            Frame::Register(provider) => {
                buf.put_u8(TAG_REGISTER);
                encode_string(provider, &mut buf);
            }
            Frame::Tail(call) => {
                buf.put_u8(TAG_TAIL);
                encode_string(&call.token, &mut buf);
                encode_string(&call.provider, &mut buf);
                encode_string(&call.path, &mut buf);
                buf.put_u32(call.last_n);
                buf.put_u8(call.follow as u8);
            }
            Frame::Request(request) => {
                buf.put_u8(TAG_REQUEST);
                encode_string(&request.key, &mut buf);
                encode_string(&request.path, &mut buf);
                buf.put_u32(request.last_n);
                buf.put_u8(request.follow as u8);
            }
            Frame::Line(line) => {
                buf.put_u8(TAG_LINE);
                encode_string(&line.key, &mut buf);
                encode_string(&line.text, &mut buf);
                buf.put_u8(line.eof as u8);
            }
            Frame::Text(text) => {
                buf.put_u8(TAG_TEXT);
                encode_string(text, &mut buf);
            }
            Frame::End => {
                buf.put_u8(TAG_END);
            }
            Frame::Error(message) => {
                buf.put_u8(TAG_ERROR);
                encode_string(message, &mut buf);
            }
            Frame::Heartbeat => {
                buf.put_u8(TAG_HEARTBEAT);
            }
            Frame::Cancel(key) => {
                buf.put_u8(TAG_CANCEL);
                encode_string(key, &mut buf);
            }
        }

        // Write length prefix (excluding the 4-byte length field itself)
        let len = (buf.len() - 4) as u32;
        buf[0..4].copy_from_slice(&len.to_be_bytes());

        buf.freeze()
    }

    /// Decode a frame from bytes (without length prefix)
    ///
    /// Expects the payload after the length prefix has been read.
    pub fn decode(mut buf: Bytes) -> Result<Self> {
        if buf.is_empty() {
            return Err(ProtoError::Malformed("empty frame".into()));
        }

        let tag = buf.get_u8();

        match tag {
            TAG_REGISTER => {
                let provider = decode_string(&mut buf)?;
                Ok(Frame::Register(provider))
            }
            TAG_TAIL => {
                let token = decode_string(&mut buf)?;
                let provider = decode_string(&mut buf)?;
                let path = decode_string(&mut buf)?;
                let last_n = decode_u32(&mut buf)?;
                let follow = decode_bool(&mut buf)?;
                Ok(Frame::Tail(TailCall {
                    token,
                    provider,
                    path,
                    last_n,
                    follow,
                }))
            }
            TAG_REQUEST => {
                let key = decode_string(&mut buf)?;
                let path = decode_string(&mut buf)?;
                let last_n = decode_u32(&mut buf)?;
                let follow = decode_bool(&mut buf)?;
                Ok(Frame::Request(TailRequest {
                    key,
                    path,
                    last_n,
                    follow,
                }))
            }
            TAG_LINE => {
                let key = decode_string(&mut buf)?;
                let text = decode_string(&mut buf)?;
                let eof = decode_bool(&mut buf)?;
                Ok(Frame::Line(Line { key, text, eof }))
            }
            TAG_TEXT => {
                let text = decode_string(&mut buf)?;
                Ok(Frame::Text(text))
            }
            TAG_END => Ok(Frame::End),
            TAG_ERROR => {
                let message = decode_string(&mut buf)?;
                Ok(Frame::Error(message))
            }
            TAG_HEARTBEAT => Ok(Frame::Heartbeat),
            TAG_CANCEL => {
                let key = decode_string(&mut buf)?;
                Ok(Frame::Cancel(key))
            }
            _ => Err(ProtoError::Malformed(format!("unknown frame tag: {tag}"))),
        }
    }
}

// ============================================================================
// Encoding helpers
// ============================================================================

fn encode_string(s: &str, buf: &mut BytesMut) {
    let bytes = s.as_bytes();
    buf.put_u32(bytes.len() as u32);
    buf.put_slice(bytes);
}

fn decode_string(buf: &mut Bytes) -> Result<String> {
    if buf.remaining() < 4 {
        return Err(ProtoError::Malformed("truncated string length".into()));
    }
    let len = buf.get_u32() as usize;
    if buf.remaining() < len {
        return Err(ProtoError::Malformed("truncated string".into()));
    }
    let bytes = buf.split_to(len);
    String::from_utf8(bytes.to_vec())
        .map_err(|e| ProtoError::Malformed(format!("invalid UTF-8: {e}")))
}

fn decode_u32(buf: &mut Bytes) -> Result<u32> {
    if buf.remaining() < 4 {
        return Err(ProtoError::Malformed("truncated u32".into()));
    }
    Ok(buf.get_u32())
}

fn decode_bool(buf: &mut Bytes) -> Result<bool> {
    if buf.remaining() < 1 {
        return Err(ProtoError::Malformed("truncated bool".into()));
    }
    Ok(buf.get_u8() != 0)
}

#[cfg(test)]
#[path = "frame_test.rs"]
mod tests;
