//! Several buffers presented as one logical byte range.

use std::cell::Cell;
use std::fmt;

use super::{Buffer, check_range, check_read_index, check_write_index};
use crate::error::{Error, Result};

struct Component<'a> {
    backing: Box<dyn Buffer + 'a>,
    /// First logical index covered (inclusive).
    start: usize,
    /// Last logical index covered (exclusive).
    end: usize,
    /// Backing index that logical `start` maps to.
    adjustment: usize,
}

impl Component<'_> {
    #[inline]
    fn contains(&self, index: usize) -> bool {
        self.start <= index && index < self.end
    }

    #[inline]
    fn backing_index(&self, index: usize) -> usize {
        self.adjustment + (index - self.start)
    }
}

/// An ordered sequence of component buffers addressed as one range.
///
/// Each component contributes its readable region at the time it is added.
/// Logical index `i` belongs to the component whose `[start, end)` contains
/// it. Components are contiguous and in order, so lookup is a binary search,
/// short-circuited by a cache of the most recently used component.
pub struct CompositeBuffer<'a> {
    components: Vec<Component<'a>>,
    read_index: usize,
    write_index: usize,
    last_accessed: Cell<Option<usize>>,
}

impl<'a> CompositeBuffer<'a> {
    /// Create an empty composite.
    #[must_use]
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
            read_index: 0,
            write_index: 0,
            last_accessed: Cell::new(None),
        }
    }

    /// Build a composite from buffers in order.
    pub fn from_buffers<I>(buffers: I) -> Self
    where
        I: IntoIterator<Item = Box<dyn Buffer + 'a>>,
    {
        let mut composite = Self::new();
        for buffer in buffers {
            composite.add_boxed(buffer);
        }
        composite
    }

    /// Append a component; its readable bytes become readable here.
    ///
    /// Empty buffers contribute nothing and are not retained.
    pub fn add_component<B: Buffer + 'a>(&mut self, buffer: B) {
        self.add_boxed(Box::new(buffer));
    }

    /// Append an already boxed component.
    pub fn add_boxed(&mut self, backing: Box<dyn Buffer + 'a>) {
        let len = backing.readable_bytes();
        if len == 0 {
            return;
        }
        let start = self.size();
        let adjustment = backing.read_index();
        self.components.push(Component {
            backing,
            start,
            end: start + len,
            adjustment,
        });
        self.write_index += len;
    }

    /// Number of retained components.
    #[inline]
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Position of the component holding logical `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] if `index >= size()`.
    pub fn find_component(&self, index: usize) -> Result<usize> {
        if let Some(cached) = self.last_accessed.get() {
            if self.components.get(cached).is_some_and(|c| c.contains(index)) {
                return Ok(cached);
            }
        }
        let size = self.size();
        if index >= size {
            return Err(Error::OutOfBounds { index, bound: size });
        }
        let found = self.components.partition_point(|c| c.end <= index);
        self.last_accessed.set(Some(found));
        Ok(found)
    }

    /// Copy the readable region out into one contiguous vector.
    ///
    /// # Errors
    ///
    /// Propagates component access failures.
    pub fn readable_to_vec(&self) -> Result<Vec<u8>> {
        let mut out = vec![0u8; self.readable_bytes()];
        self.get_bytes(self.read_index, &mut out)?;
        Ok(out)
    }
}

impl Default for CompositeBuffer<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CompositeBuffer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ranges: Vec<(usize, usize)> =
            self.components.iter().map(|c| (c.start, c.end)).collect();
        f.debug_struct("CompositeBuffer")
            .field("components", &ranges)
            .field("read_index", &self.read_index)
            .field("write_index", &self.write_index)
            .finish_non_exhaustive()
    }
}

impl Buffer for CompositeBuffer<'_> {
    #[inline]
    fn size(&self) -> usize {
        self.components.last().map_or(0, |c| c.end)
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
        check_write_index(index, self.read_index, self.size())?;
        self.write_index = index;
        Ok(())
    }

    fn chunk(&self, index: usize, len: usize) -> Result<&[u8]> {
        check_range(index, len, self.size())?;
        if len == 0 {
            return Ok(&[]);
        }
        let component = &self.components[self.find_component(index)?];
        let n = len.min(component.end - index);
        component.backing.chunk(component.backing_index(index), n)
    }

    fn chunk_mut(&mut self, index: usize, len: usize) -> Result<&mut [u8]> {
        check_range(index, len, self.size())?;
        if len == 0 {
            return Ok(&mut []);
        }
        let position = self.find_component(index)?;
        let component = &mut self.components[position];
        let n = len.min(component.end - index);
        let backing_index = component.backing_index(index);
        component.backing.chunk_mut(backing_index, n)
    }

    fn discard_read_bytes(&mut self) -> Result<()> {
        let read = self.read_index;
        if read == 0 {
            return Ok(());
        }
        if read == self.write_index && read == self.size() {
            self.components.clear();
            self.last_accessed.set(None);
            self.read_index = 0;
            self.write_index = 0;
            return Ok(());
        }

        let dropped = self.components.partition_point(|c| c.end <= read);
        self.components.drain(..dropped);
        if let Some(first) = self.components.first_mut() {
            first.adjustment += read - first.start;
            first.start = read;
        }
        for component in &mut self.components {
            component.start -= read;
            component.end -= read;
        }
        let cached = self
            .last_accessed
            .get()
            .and_then(|i| i.checked_sub(dropped));
        self.last_accessed.set(cached);

        log::trace!("composite discarded {read} bytes and {dropped} components");
        self.write_index -= read;
        self.read_index = 0;
        Ok(())
    }

    fn clear(&mut self) {
        self.read_index = 0;
        self.write_index = 0;
    }
}
