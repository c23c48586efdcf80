//! Flat memory regions.
//!
//! This module implements the byte arrays backing boot ROM, flash, SRAM and USB DPRAM.
//! It provides:
//! 1. **Storage:** A little-endian byte buffer with a fixed size.
//! 2. **Access:** Byte, halfword and word accessors at region-relative offsets.
//! 3. **Loading:** Bulk copy and fill for image loading and flash erase.
//!
//! Offsets are wrapped into the region so an access can never panic; the bus only
//! forwards offsets it has already range-checked.

/// A fixed-size, zero-initialised little-endian memory region.
#[derive(Clone)]
pub struct Memory {
    name: &'static str,
    data: Vec<u8>,
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memory")
            .field("name", &self.name)
            .field("size", &self.data.len())
            .finish()
    }
}

impl Memory {
    /// Creates a zero-filled region.
    ///
    /// # Arguments
    ///
    /// * `name` - Region name used in log output.
    /// * `size` - Size in bytes; a non-zero multiple of four.
    pub fn new(name: &'static str, size: usize) -> Self {
        Self {
            name,
            data: vec![0; size],
        }
    }

    /// Region name.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Size in bytes.
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the region has zero size.
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read-only view of the contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[inline(always)]
    const fn wrap(&self, offset: u32) -> usize {
        offset as usize % self.data.len()
    }

    /// Reads one byte.
    #[inline(always)]
    pub fn read_u8(&self, offset: u32) -> u8 {
        self.data[self.wrap(offset)]
    }

    /// Reads a halfword at a halfword-aligned offset.
    #[inline(always)]
    pub fn read_u16(&self, offset: u32) -> u16 {
        let i = self.wrap(offset & !1);
        u16::from_le_bytes([self.data[i], self.data[i + 1]])
    }

    /// Reads a word at a word-aligned offset.
    #[inline(always)]
    pub fn read_u32(&self, offset: u32) -> u32 {
        let i = self.wrap(offset & !3);
        u32::from_le_bytes([self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]])
    }

    /// Writes one byte.
    #[inline(always)]
    pub fn write_u8(&mut self, offset: u32, val: u8) {
        let i = self.wrap(offset);
        self.data[i] = val;
    }

    /// Writes a halfword at a halfword-aligned offset.
    #[inline(always)]
    pub fn write_u16(&mut self, offset: u32, val: u16) {
        let i = self.wrap(offset & !1);
        self.data[i..i + 2].copy_from_slice(&val.to_le_bytes());
    }

    /// Writes a word at a word-aligned offset.
    #[inline(always)]
    pub fn write_u32(&mut self, offset: u32, val: u32) {
        let i = self.wrap(offset & !3);
        self.data[i..i + 4].copy_from_slice(&val.to_le_bytes());
    }

    /// Copies `bytes` into the region starting at `offset`.
    ///
    /// Returns `false` (and writes nothing) if the slice does not fit.
    pub fn load(&mut self, offset: usize, bytes: &[u8]) -> bool {
        match offset.checked_add(bytes.len()) {
            Some(end) if end <= self.data.len() => {
                self.data[offset..end].copy_from_slice(bytes);
                true
            }
            _ => false,
        }
    }

    /// Sets every byte of the region to `value`.
    pub fn fill(&mut self, value: u8) {
        self.data.fill(value);
    }
}
