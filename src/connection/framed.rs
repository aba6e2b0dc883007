//! Frame I/O over the two halves of a transport.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::buffer::{Buffer, ByteBuffer, read_from_async, write_to_async};
use crate::config::Config;
use crate::connection::Role;
use crate::error::{Error, Result};
use crate::protocol::codec::{decode_body, encode_into};
use crate::protocol::{Frame, FrameHeader, FrameValidator, generate_mask};

/// Reads frames from the receiving half of a transport.
#[derive(Debug)]
pub(crate) struct FrameReader<R> {
    io: R,
    buf: ByteBuffer,
    validator: FrameValidator,
    read_chunk: usize,
}

impl<R> FrameReader<R> {
    /// `buf` holds any bytes that arrived together with the handshake.
    pub(crate) fn new(io: R, buf: ByteBuffer, role: Role, config: &Config) -> Self {
        let validator = FrameValidator::new(role, config.limits.clone())
            .with_accept_unmasked(config.accept_unmasked_frames);
        Self {
            io,
            buf,
            validator,
            read_chunk: config.read_buffer_size.max(1),
        }
    }
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Read the next frame. `Ok(None)` means the peer ended the stream on a
    /// frame boundary.
    ///
    /// Cancel safe: bytes read before the future is dropped stay buffered.
    pub(crate) async fn read_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            let missing = match FrameHeader::peek(&self.buf) {
                Ok(header) => {
                    self.validator.validate(&header)?;
                    let total = header.frame_len()?;
                    let available = self.buf.readable_bytes();
                    if available >= total {
                        self.buf.skip_bytes(header.header_len)?;
                        return decode_body(&header, &mut self.buf).map(Some);
                    }
                    total - available
                }
                Err(Error::IncompleteFrame { needed }) => needed,
                Err(err) => return Err(err),
            };
            if !self.fill(missing).await? {
                if self.buf.readable_bytes() == 0 {
                    return Ok(None);
                }
                return Err(Error::Io(format!(
                    "stream ended {missing} bytes short of a complete frame"
                )));
            }
        }
    }

    /// Read at least once from the transport. Returns false at end of stream.
    async fn fill(&mut self, missing: usize) -> Result<bool> {
        if self.buf.readable_bytes() == 0 {
            self.buf.clear();
        }
        self.buf.ensure_writable(missing.max(self.read_chunk));
        let room = self.buf.writable_bytes();
        let n = read_from_async(&mut self.buf, &mut self.io, room).await?;
        Ok(n > 0)
    }
}

/// Writes frames to the sending half of a transport, masking them when the
/// local role requires it.
#[derive(Debug)]
pub(crate) struct FrameWriter<W> {
    io: W,
    buf: ByteBuffer,
    role: Role,
    flush_threshold: usize,
}

impl<W> FrameWriter<W> {
    pub(crate) fn new(io: W, role: Role, config: &Config) -> Self {
        Self {
            io,
            buf: ByteBuffer::new(config.write_buffer_size),
            role,
            flush_threshold: config.write_buffer_size.max(1),
        }
    }

    fn stage(&mut self, mut frame: Frame) -> Result<()> {
        frame.mask = if self.role.masks_outgoing() {
            Some(generate_mask()?)
        } else {
            None
        };
        self.buf.ensure_writable(frame.wire_size());
        encode_into(&frame, &mut self.buf)?;
        Ok(())
    }
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// Write `frames` back to back and flush.
    ///
    /// Frames are staged in the write buffer and drained whenever it passes
    /// the configured size, so a long fragmented message never needs to be
    /// buffered whole.
    pub(crate) async fn write_frames<I>(&mut self, frames: I) -> Result<()>
    where
        I: IntoIterator<Item = Frame>,
    {
        let result = self.write_all_frames(frames).await;
        if result.is_err() {
            self.buf.clear();
        }
        result
    }

    async fn write_all_frames<I>(&mut self, frames: I) -> Result<()>
    where
        I: IntoIterator<Item = Frame>,
    {
        for frame in frames {
            self.stage(frame)?;
            if self.buf.readable_bytes() >= self.flush_threshold {
                self.drain().await?;
            }
        }
        self.drain().await?;
        self.io.flush().await?;
        Ok(())
    }

    async fn drain(&mut self) -> Result<()> {
        while self.buf.readable_bytes() > 0 {
            let pending = self.buf.readable_bytes();
            let n = write_to_async(&mut self.buf, &mut self.io, pending).await?;
            if n == 0 {
                return Err(Error::Io("transport accepted no bytes".into()));
            }
        }
        self.buf.clear();
        Ok(())
    }

    pub(crate) async fn shutdown(&mut self) -> Result<()> {
        self.io.shutdown().await?;
        Ok(())
    }
}
