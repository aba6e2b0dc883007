//! A single contiguous byte region with independent read and write cursors.

use super::{Buffer, check_range, check_read_index, check_write_index};
use crate::error::Result;

/// Growable byte buffer with read and write cursors.
///
/// The buffer owns its storage. Capacity only changes through
/// [`ByteBuffer::ensure_writable`], which never shrinks it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteBuffer {
    data: Vec<u8>,
    read_index: usize,
    write_index: usize,
}

impl ByteBuffer {
    /// Size used by [`ByteBuffer::default`].
    pub const DEFAULT_SIZE: usize = 2048;

    /// Create an empty buffer of `size` zeroed bytes.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size],
            read_index: 0,
            write_index: 0,
        }
    }

    /// Wrap an existing byte region. Every wrapped byte is readable.
    #[must_use]
    pub fn wrap(data: Vec<u8>) -> Self {
        let write_index = data.len();
        Self {
            data,
            read_index: 0,
            write_index,
        }
    }

    /// The readable region `[read_index, write_index)`.
    #[inline]
    #[must_use]
    pub fn readable_slice(&self) -> &[u8] {
        &self.data[self.read_index..self.write_index]
    }

    /// The whole backing storage, irrespective of cursors.
    #[inline]
    #[must_use]
    pub fn storage(&self) -> &[u8] {
        &self.data
    }

    /// Make room for at least `additional` writable bytes.
    ///
    /// Compacts first when that alone frees enough space, otherwise grows
    /// the storage to at least double its current size.
    pub fn ensure_writable(&mut self, additional: usize) {
        if self.writable_bytes() >= additional {
            return;
        }
        if self.read_index > 0 && self.data.len() - self.readable_bytes() >= additional {
            self.compact();
            return;
        }
        self.compact();
        let needed = self.write_index + additional;
        let grown = needed.max(self.data.len().saturating_mul(2));
        self.data.resize(grown, 0);
    }

    /// Consume the buffer, returning its readable bytes.
    #[must_use]
    pub fn into_readable(mut self) -> Vec<u8> {
        self.data.truncate(self.write_index);
        self.data.drain(..self.read_index);
        self.data
    }

    fn compact(&mut self) {
        if self.read_index == 0 {
            return;
        }
        self.data.copy_within(self.read_index..self.write_index, 0);
        self.write_index -= self.read_index;
        self.read_index = 0;
    }
}

impl Default for ByteBuffer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SIZE)
    }
}

impl Buffer for ByteBuffer {
    #[inline]
    fn size(&self) -> usize {
        self.data.len()
    }

    #[inline]
    fn read_index(&self) -> usize {
        self.read_index
    }

    #[inline]
    fn write_index(&self) -> usize {
        self.write_index
    }

    fn set_read_index(&mut self, index: usize) -> Result<()> {
        check_read_index(index, self.write_index)?;
        self.read_index = index;
        Ok(())
    }

    fn set_write_index(&mut self, index: usize) -> Result<()> {
        check_write_index(index, self.read_index, self.data.len())?;
        self.write_index = index;
        Ok(())
    }

    #[inline]
    fn chunk(&self, index: usize, len: usize) -> Result<&[u8]> {
        check_range(index, len, self.data.len())?;
        Ok(&self.data[index..index + len])
    }

    #[inline]
    fn chunk_mut(&mut self, index: usize, len: usize) -> Result<&mut [u8]> {
        check_range(index, len, self.data.len())?;
        Ok(&mut self.data[index..index + len])
    }

    fn discard_read_bytes(&mut self) -> Result<()> {
        self.compact();
        Ok(())
    }

    fn clear(&mut self) {
        self.read_index = 0;
        self.write_index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_new_buffer_is_empty() {
        let buf = ByteBuffer::new(16);
        assert_eq!(buf.size(), 16);
        assert_eq!(buf.readable_bytes(), 0);
        assert_eq!(buf.writable_bytes(), 16);
    }

    #[test]
    fn test_wrap_marks_bytes_readable() {
        let buf = ByteBuffer::wrap(vec![1, 2, 3]);
        assert_eq!(buf.readable_bytes(), 3);
        assert_eq!(buf.writable_bytes(), 0);
        assert_eq!(buf.readable_slice(), &[1, 2, 3]);
    }

    #[test]
    fn test_write_then_read() {
        let mut buf = ByteBuffer::new(8);
        buf.write_bytes(b"abc").unwrap();
        buf.write_byte(b'd').unwrap();
        assert_eq!(buf.readable_bytes(), 4);
        assert_eq!(buf.read_byte().unwrap(), b'a');
        assert_eq!(buf.read_bytes(3).unwrap(), b"bcd");
        assert_eq!(buf.readable_bytes(), 0);
    }

    #[test]
    fn test_write_index_past_size_is_out_of_bounds() {
        let mut buf = ByteBuffer::new(8);
        let result = buf.set_write_index(9);
        assert!(matches!(
            result,
            Err(Error::OutOfBounds { index: 9, bound: 8 })
        ));
        assert!(buf.set_write_index(8).is_ok());
    }

    #[test]
    fn test_read_index_past_write_index_is_out_of_bounds() {
        let mut buf = ByteBuffer::new(8);
        buf.write_bytes(b"ab").unwrap();
        assert!(matches!(
            buf.set_read_index(3),
            Err(Error::OutOfBounds { index: 3, bound: 2 })
        ));
        assert!(buf.set_read_index(usize::MAX).is_err());
        assert!(buf.set_read_index(2).is_ok());
    }

    #[test]
    fn test_write_index_below_read_index_is_rejected() {
        let mut buf = ByteBuffer::wrap(vec![0; 4]);
        buf.set_read_index(3).unwrap();
        assert!(buf.set_write_index(2).is_err());
    }

    #[test]
    fn test_read_bytes_insufficient_performs_no_partial_read() {
        let mut buf = ByteBuffer::wrap(b"abc".to_vec());
        let result = buf.read_bytes(4);
        assert!(matches!(
            result,
            Err(Error::InsufficientBytes {
                requested: 4,
                available: 3
            })
        ));
        assert_eq!(buf.read_index(), 0);
        assert_eq!(buf.readable_bytes(), 3);
    }

    #[test]
    fn test_write_bytes_insufficient_space() {
        let mut buf = ByteBuffer::new(2);
        assert!(matches!(
            buf.write_bytes(b"abc"),
            Err(Error::InsufficientBytes {
                requested: 3,
                available: 2
            })
        ));
        assert_eq!(buf.write_index(), 0);
    }

    #[test]
    fn test_absolute_access_does_not_move_cursors() {
        let mut buf = ByteBuffer::new(4);
        buf.set_byte(3, 9).unwrap();
        assert_eq!(buf.get_byte(3).unwrap(), 9);
        assert_eq!(buf.read_index(), 0);
        assert_eq!(buf.write_index(), 0);
        assert!(matches!(
            buf.get_byte(4),
            Err(Error::OutOfBounds { index: 4, bound: 4 })
        ));
        assert!(buf.set_byte(4, 0).is_err());
    }

    #[test]
    fn test_discard_read_bytes() {
        let mut buf = ByteBuffer::new(8);
        buf.write_bytes(b"abcdef").unwrap();
        buf.skip_bytes(4).unwrap();
        buf.discard_read_bytes().unwrap();
        assert_eq!(buf.read_index(), 0);
        assert_eq!(buf.write_index(), 2);
        assert_eq!(buf.readable_slice(), b"ef");
        assert_eq!(buf.writable_bytes(), 6);
    }

    #[test]
    fn test_ensure_writable_compacts_before_growing() {
        let mut buf = ByteBuffer::new(8);
        buf.write_bytes(b"abcdefgh").unwrap();
        buf.skip_bytes(6).unwrap();
        buf.ensure_writable(4);
        assert_eq!(buf.size(), 8);
        assert_eq!(buf.readable_slice(), b"gh");
        assert_eq!(buf.writable_bytes(), 6);
    }

    #[test]
    fn test_ensure_writable_grows_without_shrinking() {
        let mut buf = ByteBuffer::new(4);
        buf.write_bytes(b"abcd").unwrap();
        buf.ensure_writable(10);
        assert!(buf.size() >= 14);
        assert_eq!(buf.readable_slice(), b"abcd");
        buf.ensure_writable(1);
        assert!(buf.size() >= 14);
    }

    #[test]
    fn test_into_readable() {
        let mut buf = ByteBuffer::new(8);
        buf.write_bytes(b"xyz").unwrap();
        buf.skip_bytes(1).unwrap();
        assert_eq!(buf.into_readable(), b"yz");
    }
}
