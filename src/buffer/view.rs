//! Views that share another buffer's storage.
//!
//! A view owns only its cursors. Writes through a view land in the parent's
//! storage, and compacting a view moves bytes inside that shared storage, so
//! a compacted view rewrites what the parent (and any later view) sees.

use std::fmt;

use super::{Buffer, check_range, check_read_index, check_write_index, shift_down};
use crate::error::Result;

/// A fixed window `[offset, offset + len)` over a parent buffer.
///
/// Index 0 of the slice is index `offset` of the parent. The slice starts
/// fully readable: `read_index = 0`, `write_index = len`.
pub struct Slice<'a> {
    parent: &'a mut dyn Buffer,
    offset: usize,
    len: usize,
    read_index: usize,
    write_index: usize,
}

impl<'a> Slice<'a> {
    /// Create a window of `len` bytes starting at `offset` in `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`](crate::error::Error::OutOfBounds) if the
    /// window extends past the parent's size.
    pub fn new(parent: &'a mut dyn Buffer, offset: usize, len: usize) -> Result<Self> {
        check_range(offset, len, parent.size())?;
        Ok(Self {
            parent,
            offset,
            len,
            read_index: 0,
            write_index: len,
        })
    }

    /// Parent index that corresponds to slice index 0.
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }
}

impl fmt::Debug for Slice<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slice")
            .field("offset", &self.offset)
            .field("len", &self.len)
            .field("read_index", &self.read_index)
            .field("write_index", &self.write_index)
            .finish_non_exhaustive()
    }
}

impl Buffer for Slice<'_> {
    #[inline]
    fn size(&self) -> usize {
        self.len
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
        check_write_index(index, self.read_index, self.len)?;
        self.write_index = index;
        Ok(())
    }

    fn chunk(&self, index: usize, len: usize) -> Result<&[u8]> {
        check_range(index, len, self.len)?;
        self.parent.chunk(self.offset + index, len)
    }

    fn chunk_mut(&mut self, index: usize, len: usize) -> Result<&mut [u8]> {
        check_range(index, len, self.len)?;
        self.parent.chunk_mut(self.offset + index, len)
    }

    fn discard_read_bytes(&mut self) -> Result<()> {
        shift_down(
            &mut *self.parent,
            self.offset,
            self.read_index,
            self.write_index,
        )?;
        self.write_index -= self.read_index;
        self.read_index = 0;
        Ok(())
    }

    fn clear(&mut self) {
        self.read_index = 0;
        self.write_index = 0;
    }
}

/// The whole of a parent buffer with independent cursors.
///
/// Cursors start as a copy of the parent's and move independently from then
/// on.
pub struct Duplicate<'a> {
    parent: &'a mut dyn Buffer,
    read_index: usize,
    write_index: usize,
}

impl<'a> Duplicate<'a> {
    /// Create a duplicate view of `parent`.
    #[must_use]
    pub fn new(parent: &'a mut dyn Buffer) -> Self {
        let read_index = parent.read_index();
        let write_index = parent.write_index();
        Self {
            parent,
            read_index,
            write_index,
        }
    }
}

impl fmt::Debug for Duplicate<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Duplicate")
            .field("size", &self.parent.size())
            .field("read_index", &self.read_index)
            .field("write_index", &self.write_index)
            .finish_non_exhaustive()
    }
}

impl Buffer for Duplicate<'_> {
    #[inline]
    fn size(&self) -> usize {
        self.parent.size()
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
        check_write_index(index, self.read_index, self.parent.size())?;
        self.write_index = index;
        Ok(())
    }

    fn chunk(&self, index: usize, len: usize) -> Result<&[u8]> {
        self.parent.chunk(index, len)
    }

    fn chunk_mut(&mut self, index: usize, len: usize) -> Result<&mut [u8]> {
        self.parent.chunk_mut(index, len)
    }

    fn discard_read_bytes(&mut self) -> Result<()> {
        shift_down(&mut *self.parent, 0, self.read_index, self.write_index)?;
        self.write_index -= self.read_index;
        self.read_index = 0;
        Ok(())
    }

    fn clear(&mut self) {
        self.read_index = 0;
        self.write_index = 0;
    }
}
