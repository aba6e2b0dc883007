//! Cursor-based byte containers.
//!
//! Every container implements [`Buffer`]: a fixed addressable range
//! `[0, size)` with a read cursor and a write cursor satisfying
//! `read_index <= write_index <= size`. Bytes in `[read_index, write_index)`
//! are readable, bytes in `[write_index, size)` are writable.
//!
//! | Kind | Storage |
//! |------|---------|
//! | [`ByteBuffer`] | owns one contiguous region |
//! | [`Slice`] | borrows a fixed window of another buffer |
//! | [`Duplicate`] | borrows the whole of another buffer with its own cursors |
//! | [`CompositeBuffer`] | stitches several buffers into one logical range |
//!
//! Views borrow their parent mutably, so the parent outlives every view by
//! construction. The buffer engine never blocks: when there is not enough
//! data or space it reports [`Error::InsufficientBytes`] and leaves the
//! blocking policy to the caller.
//!
//! ## Example
//!
//! ```
//! use wsframe::buffer::{Buffer, ByteBuffer, Slice};
//!
//! let mut buf = ByteBuffer::new(8);
//! buf.write_bytes(b"abcdef").unwrap();
//!
//! let mut window = Slice::new(&mut buf, 2, 3).unwrap();
//! assert_eq!(window.read_bytes(3).unwrap(), b"cde");
//! window.set_byte(0, b'C').unwrap();
//!
//! assert_eq!(buf.get_byte(2).unwrap(), b'C');
//! ```

mod byte_buf;
mod composite;
#[cfg(feature = "async-tokio")]
mod transfer;
mod view;

pub use byte_buf::ByteBuffer;
pub use composite::CompositeBuffer;
#[cfg(feature = "async-tokio")]
pub use transfer::{read_from_async, write_to_async};
pub use view::{Duplicate, Slice};

use std::io;

use crate::error::{Error, Result};

/// The capability set shared by all buffer kinds.
///
/// Implementors provide cursor bookkeeping and contiguous region access;
/// every byte-level and transfer operation is derived from those.
pub trait Buffer {
    /// Total addressable size in bytes.
    fn size(&self) -> usize;

    /// Current read cursor.
    fn read_index(&self) -> usize;

    /// Current write cursor.
    fn write_index(&self) -> usize;

    /// Move the read cursor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] unless `index <= write_index()`.
    fn set_read_index(&mut self, index: usize) -> Result<()>;

    /// Move the write cursor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] unless `read_index() <= index <= size()`.
    fn set_write_index(&mut self, index: usize) -> Result<()>;

    /// The longest contiguous run of bytes starting at `index`, at most `len`
    /// bytes long. Never empty when `len > 0`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] if `index + len > size()`.
    fn chunk(&self, index: usize, len: usize) -> Result<&[u8]>;

    /// Mutable counterpart of [`Buffer::chunk`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] if `index + len > size()`.
    fn chunk_mut(&mut self, index: usize, len: usize) -> Result<&mut [u8]>;

    /// Compact the consumed prefix: readable bytes move to offset 0 and both
    /// cursors drop by the old read index.
    ///
    /// # Errors
    ///
    /// Only views can fail here, when the parent rejects the shifted range.
    fn discard_read_bytes(&mut self) -> Result<()>;

    /// Reset both cursors to 0 without touching storage.
    fn clear(&mut self);

    /// Bytes between the read and write cursors.
    #[inline]
    fn readable_bytes(&self) -> usize {
        self.write_index() - self.read_index()
    }

    /// Bytes between the write cursor and the end of the buffer.
    #[inline]
    fn writable_bytes(&self) -> usize {
        self.size() - self.write_index()
    }

    /// Absolute read; does not move any cursor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] if `index >= size()`.
    fn get_byte(&self, index: usize) -> Result<u8> {
        let chunk = self.chunk(index, 1)?;
        chunk.first().copied().ok_or(Error::OutOfBounds {
            index,
            bound: self.size(),
        })
    }

    /// Absolute write; does not move any cursor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] if `index >= size()`.
    fn set_byte(&mut self, index: usize, value: u8) -> Result<()> {
        let size = self.size();
        let chunk = self.chunk_mut(index, 1)?;
        let slot = chunk
            .first_mut()
            .ok_or(Error::OutOfBounds { index, bound: size })?;
        *slot = value;
        Ok(())
    }

    /// Absolute copy of `dst.len()` bytes starting at `index` into `dst`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] if the range exceeds `size()`.
    fn get_bytes(&self, index: usize, dst: &mut [u8]) -> Result<()> {
        check_range(index, dst.len(), self.size())?;
        let mut done = 0;
        while done < dst.len() {
            let chunk = self.chunk(index + done, dst.len() - done)?;
            if chunk.is_empty() {
                return Err(Error::OutOfBounds {
                    index: index + done,
                    bound: self.size(),
                });
            }
            dst[done..done + chunk.len()].copy_from_slice(chunk);
            done += chunk.len();
        }
        Ok(())
    }

    /// Absolute copy of `src` into the buffer starting at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] if the range exceeds `size()`.
    fn set_bytes(&mut self, index: usize, src: &[u8]) -> Result<()> {
        let size = self.size();
        check_range(index, src.len(), size)?;
        let mut done = 0;
        while done < src.len() {
            let chunk = self.chunk_mut(index + done, src.len() - done)?;
            if chunk.is_empty() {
                return Err(Error::OutOfBounds {
                    index: index + done,
                    bound: size,
                });
            }
            let n = chunk.len();
            chunk.copy_from_slice(&src[done..done + n]);
            done += n;
        }
        Ok(())
    }

    /// Read one byte at the read cursor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientBytes`] if nothing is readable.
    fn read_byte(&mut self) -> Result<u8> {
        require_readable(self, 1)?;
        let index = self.read_index();
        let value = self.get_byte(index)?;
        self.set_read_index(index + 1)?;
        Ok(value)
    }

    /// Write one byte at the write cursor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientBytes`] if nothing is writable.
    fn write_byte(&mut self, value: u8) -> Result<()> {
        require_writable(self, 1)?;
        let index = self.write_index();
        self.set_byte(index, value)?;
        self.set_write_index(index + 1)
    }

    /// Fill `dst` from the read cursor. All or nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientBytes`] if fewer than `dst.len()` bytes
    /// are readable; no bytes are consumed in that case.
    fn read_into(&mut self, dst: &mut [u8]) -> Result<()> {
        require_readable(self, dst.len())?;
        let index = self.read_index();
        self.get_bytes(index, dst)?;
        self.set_read_index(index + dst.len())
    }

    /// Read exactly `len` bytes from the read cursor. All or nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientBytes`] if fewer than `len` bytes are
    /// readable.
    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        require_readable(self, len)?;
        let mut out = vec![0u8; len];
        self.read_into(&mut out)?;
        Ok(out)
    }

    /// Advance the read cursor by `len` without copying.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientBytes`] if fewer than `len` bytes are
    /// readable.
    fn skip_bytes(&mut self, len: usize) -> Result<()> {
        require_readable(self, len)?;
        let index = self.read_index();
        self.set_read_index(index + len)
    }

    /// Append `src` at the write cursor. All or nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientBytes`] if fewer than `src.len()` bytes
    /// are writable.
    fn write_bytes(&mut self, src: &[u8]) -> Result<()> {
        require_writable(self, src.len())?;
        let index = self.write_index();
        self.set_bytes(index, src)?;
        self.set_write_index(index + src.len())
    }

    /// Read a big-endian `u16`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientBytes`] if fewer than 2 bytes are readable.
    fn read_u16(&mut self) -> Result<u16> {
        let mut raw = [0u8; 2];
        self.read_into(&mut raw)?;
        Ok(u16::from_be_bytes(raw))
    }

    /// Read a big-endian `u64`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientBytes`] if fewer than 8 bytes are readable.
    fn read_u64(&mut self) -> Result<u64> {
        let mut raw = [0u8; 8];
        self.read_into(&mut raw)?;
        Ok(u64::from_be_bytes(raw))
    }

    /// Write a big-endian `u16`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientBytes`] if fewer than 2 bytes are writable.
    fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    /// Write a big-endian `u64`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientBytes`] if fewer than 8 bytes are writable.
    fn write_u64(&mut self, value: u64) -> Result<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    /// Read up to `max_len` bytes from `reader` into the writable region,
    /// advancing the write cursor by the number of bytes actually moved.
    ///
    /// Regions are filled in order; the transfer stops at the first short
    /// read. A reader error is returned as-is after the cursor has been
    /// advanced over whatever was already transferred.
    ///
    /// # Errors
    ///
    /// - [`Error::InsufficientBytes`] if `max_len > writable_bytes()`
    /// - [`Error::TransportContract`] if the reader claims more bytes than it
    ///   was offered
    /// - [`Error::Io`] from the reader
    fn read_from(&mut self, reader: &mut dyn io::Read, max_len: usize) -> Result<usize> {
        require_writable(self, max_len)?;
        let mut total = 0;
        while total < max_len {
            let index = self.write_index();
            let chunk = self.chunk_mut(index, max_len - total)?;
            let offered = chunk.len();
            let n = reader.read(chunk)?;
            check_transfer("read", n, offered)?;
            self.set_write_index(index + n)?;
            total += n;
            if n < offered {
                break;
            }
        }
        Ok(total)
    }

    /// Write up to `max_len` readable bytes to `writer`, advancing the read
    /// cursor by the number of bytes actually moved.
    ///
    /// # Errors
    ///
    /// - [`Error::InsufficientBytes`] if `max_len > readable_bytes()`
    /// - [`Error::TransportContract`] if the writer claims more bytes than it
    ///   was offered
    /// - [`Error::Io`] from the writer
    fn write_to(&mut self, writer: &mut dyn io::Write, max_len: usize) -> Result<usize> {
        require_readable(self, max_len)?;
        let mut total = 0;
        while total < max_len {
            let index = self.read_index();
            let chunk = self.chunk(index, max_len - total)?;
            let offered = chunk.len();
            let n = writer.write(chunk)?;
            check_transfer("write", n, offered)?;
            self.set_read_index(index + n)?;
            total += n;
            if n < offered {
                break;
            }
        }
        Ok(total)
    }
}

/// Check that `[index, index + len)` lies within `[0, size)`.
pub(crate) fn check_range(index: usize, len: usize, size: usize) -> Result<()> {
    match index.checked_add(len) {
        Some(end) if end <= size => Ok(()),
        _ => Err(Error::OutOfBounds {
            index: index.saturating_add(len.saturating_sub(1)),
            bound: size,
        }),
    }
}

/// Validate a new read cursor against the current write cursor.
pub(crate) fn check_read_index(index: usize, write_index: usize) -> Result<()> {
    if index > write_index {
        return Err(Error::OutOfBounds {
            index,
            bound: write_index,
        });
    }
    Ok(())
}

/// Validate a new write cursor against the read cursor and the size.
pub(crate) fn check_write_index(index: usize, read_index: usize, size: usize) -> Result<()> {
    if index > size {
        return Err(Error::OutOfBounds { index, bound: size });
    }
    if index < read_index {
        return Err(Error::OutOfBounds {
            index,
            bound: read_index,
        });
    }
    Ok(())
}

pub(crate) fn require_readable<B: Buffer + ?Sized>(buf: &B, len: usize) -> Result<()> {
    let available = buf.readable_bytes();
    if len > available {
        return Err(Error::InsufficientBytes {
            requested: len,
            available,
        });
    }
    Ok(())
}

pub(crate) fn require_writable<B: Buffer + ?Sized>(buf: &B, len: usize) -> Result<()> {
    let available = buf.writable_bytes();
    if len > available {
        return Err(Error::InsufficientBytes {
            requested: len,
            available,
        });
    }
    Ok(())
}

/// A transport may never report more bytes than the region it was handed.
pub(crate) fn check_transfer(direction: &str, n: usize, offered: usize) -> Result<()> {
    if n > offered {
        log::error!("transport {direction} reported {n} bytes for a {offered}-byte region");
        return Err(Error::TransportContract(format!(
            "{direction} reported {n} bytes for a {offered}-byte region"
        )));
    }
    Ok(())
}

/// Move `[base + from, base + to)` down to `base` inside `buf`.
///
/// Used by views to compact through their parent's storage.
pub(crate) fn shift_down(buf: &mut dyn Buffer, base: usize, from: usize, to: usize) -> Result<()> {
    if from == 0 || from >= to {
        return Ok(());
    }
    if let Ok(region) = buf.chunk_mut(base, to) {
        if region.len() == to {
            region.copy_within(from..to, 0);
            return Ok(());
        }
    }
    // Parent storage is not contiguous over the range; move byte by byte.
    for i in 0..(to - from) {
        let value = buf.get_byte(base + from + i)?;
        buf.set_byte(base + i, value)?;
    }
    Ok(())
}
