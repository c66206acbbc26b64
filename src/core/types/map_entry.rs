//! Logical-to-physical mapping entries

use super::address::MemoryAddress;
use super::memory_info::clamp_size;
use serde::{Deserialize, Serialize};

/// A block of bytes addressed at `logical_base` and backed at `physical_base`.
///
/// For every entry, mirrored or not,
/// `logical_end - logical_base == physical_end - physical_base == size`,
/// with no wrap-around. A size that would run past the top of either range is
/// clamped to fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryMapEntry {
    pub size: usize,
    pub is_mirror: bool,
    pub logical_base: MemoryAddress,
    pub logical_end: MemoryAddress,
    pub physical_base: MemoryAddress,
    pub physical_end: MemoryAddress,
}

impl MemoryMapEntry {
    /// Builds an entry from raw integer bounds
    pub fn new(physical_base: usize, logical_base: usize, size: usize) -> Self {
        Self::from_addresses(
            MemoryAddress::new(physical_base),
            MemoryAddress::new(logical_base),
            size,
        )
    }

    /// Builds an entry from address-typed bounds
    pub fn from_addresses(
        physical_base: MemoryAddress,
        logical_base: MemoryAddress,
        size: usize,
    ) -> Self {
        let size = clamp_size(logical_base, clamp_size(physical_base, size));
        MemoryMapEntry {
            size,
            is_mirror: false,
            logical_base,
            logical_end: logical_base.wrapping_add(size),
            physical_base,
            physical_end: physical_base.wrapping_add(size),
        }
    }

    /// Identity mapping: logical and physical addresses coincide
    pub fn identity(base: MemoryAddress, size: usize) -> Self {
        Self::from_addresses(base, base, size)
    }

    /// Same physical bytes exposed at a different logical base
    pub fn mirror(&self, logical_base: impl Into<MemoryAddress>) -> Self {
        let logical_base = logical_base.into();
        let size = clamp_size(logical_base, self.size);
        MemoryMapEntry {
            size,
            is_mirror: true,
            logical_base,
            logical_end: logical_base.wrapping_add(size),
            physical_base: self.physical_base,
            physical_end: self.physical_base.wrapping_add(size),
        }
    }

    /// Whether `logical` falls inside this entry's logical range
    pub fn contains_logical(&self, logical: MemoryAddress) -> bool {
        logical
            .offset_from(self.logical_base)
            .map_or(false, |offset| offset < self.size)
    }

    /// Maps a logical address to the physical address backing it
    pub fn translate(&self, logical: MemoryAddress) -> Option<MemoryAddress> {
        let offset = logical.offset_from(self.logical_base)?;
        if offset < self.size {
            Some(self.physical_base.wrapping_add(offset))
        } else {
            None
        }
    }
}
