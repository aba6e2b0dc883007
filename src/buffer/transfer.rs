//! Async counterparts of [`Buffer::read_from`] and [`Buffer::write_to`].

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::{Buffer, check_transfer, require_readable, require_writable};
use crate::error::Result;

/// Read up to `max_len` bytes from `reader` into `buf`'s writable region.
///
/// Performs at most one successful transfer per contiguous region and stops
/// at the first short read, so it never waits for more data than one
/// `read` call yields. Returns 0 at end of stream.
///
/// # Errors
///
/// - [`Error::InsufficientBytes`](crate::error::Error::InsufficientBytes) if
///   `max_len` exceeds the writable space
/// - [`Error::TransportContract`](crate::error::Error::TransportContract) if
///   the reader reports more bytes than it was offered
/// - [`Error::Io`](crate::error::Error::Io) from the reader
pub async fn read_from_async<B, R>(buf: &mut B, reader: &mut R, max_len: usize) -> Result<usize>
where
    B: Buffer + ?Sized,
    R: AsyncRead + Unpin + ?Sized,
{
    require_writable(buf, max_len)?;
    let mut total = 0;
    while total < max_len {
        let index = buf.write_index();
        let chunk = buf.chunk_mut(index, max_len - total)?;
        let offered = chunk.len();
        let n = reader.read(chunk).await?;
        check_transfer("read", n, offered)?;
        buf.set_write_index(index + n)?;
        total += n;
        if n < offered {
            break;
        }
    }
    Ok(total)
}

/// Write up to `max_len` readable bytes of `buf` to `writer`.
///
/// # Errors
///
/// - [`Error::InsufficientBytes`](crate::error::Error::InsufficientBytes) if
///   `max_len` exceeds the readable bytes
/// - [`Error::TransportContract`](crate::error::Error::TransportContract) if
///   the writer reports more bytes than it was offered
/// - [`Error::Io`](crate::error::Error::Io) from the writer
pub async fn write_to_async<B, W>(buf: &mut B, writer: &mut W, max_len: usize) -> Result<usize>
where
    B: Buffer + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    require_readable(buf, max_len)?;
    let mut total = 0;
    while total < max_len {
        let index = buf.read_index();
        let chunk = buf.chunk(index, max_len - total)?;
        let offered = chunk.len();
        let n = writer.write(chunk).await?;
        check_transfer("write", n, offered)?;
        buf.set_read_index(index + n)?;
        total += n;
        if n < offered {
            break;
        }
    }
    Ok(total)
}
