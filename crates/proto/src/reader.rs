//! Framing layer shared by the relay, agents and tail clients
//!
//! `FrameReader` accumulates socket reads in a buffer and yields complete
//! frames; `write_frame` writes one encoded frame to any async writer.

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::MAX_FRAME_SIZE;
use crate::error::{ProtoError, Result};
use crate::frame::Frame;

/// Initial read buffer capacity
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Buffered frame reader over an async byte stream
pub struct FrameReader<R> {
    inner: R,
    buf: BytesMut,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Wrap an async reader
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(READ_BUFFER_SIZE),
        }
    }

    /// Read the next frame
    ///
    /// Returns `Ok(None)` when the peer closed the stream cleanly between
    /// frames. A stream that ends mid-frame is a protocol error.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            // Try to parse a complete frame from the buffer
            if self.buf.len() >= 4 {
                let len =
                    u32::from_be_bytes([self.buf[0], self.buf[1], self.buf[2], self.buf[3]]);

                if len > MAX_FRAME_SIZE {
                    return Err(ProtoError::FrameTooLarge {
                        len,
                        max: MAX_FRAME_SIZE,
                    });
                }

                if self.buf.len() >= 4 + len as usize {
                    self.buf.advance(4);
                    let payload = self.buf.split_to(len as usize).freeze();
                    return Frame::decode(payload).map(Some);
                }
            }

            // Need more data
            let n = self.inner.read_buf(&mut self.buf).await?;
            if n == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Err(ProtoError::Malformed("stream ended mid-frame".into()));
            }
        }
    }

    /// Consume the reader, returning the underlying stream
    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Write one frame to an async writer
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, frame: &Frame) -> Result<()> {
    writer.write_all(&frame.encode()).await?;
    Ok(())
}

#[cfg(test)]
#[path = "reader_test.rs"]
mod tests;
