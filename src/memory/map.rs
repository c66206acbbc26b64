//! Logical address map assembled from walked regions and explicit mirrors

use crate::core::types::{MemoryAddress, MemoryInformation, MemoryMapEntry};
use serde::Serialize;
use tracing::debug;

/// Entries ordered by logical base
#[derive(Debug, Clone, Default, Serialize)]
pub struct MemoryMap {
    entries: Vec<MemoryMapEntry>,
}

impl MemoryMap {
    pub fn new() -> Self {
        MemoryMap::default()
    }

    /// Identity-maps every region (mirrors keep their flag but map to themselves)
    pub fn from_regions<I>(regions: I) -> Self
    where
        I: IntoIterator<Item = MemoryInformation>,
    {
        let mut map = MemoryMap::new();
        for region in regions {
            let mut entry = MemoryMapEntry::identity(region.allocation_base, region.allocation_size);
            entry.is_mirror = region.is_mirror;
            map.push(entry);
        }
        map
    }

    /// Inserts an entry keeping logical order
    pub fn push(&mut self, entry: MemoryMapEntry) {
        let index = self
            .entries
            .partition_point(|existing| existing.logical_base <= entry.logical_base);
        self.entries.insert(index, entry);
    }

    /// Exposes the non-mirror entry whose logical range holds `source` again at
    /// `logical_base`, returning the new mirror entry
    pub fn add_mirror(
        &mut self,
        source: MemoryAddress,
        logical_base: MemoryAddress,
    ) -> Option<MemoryMapEntry> {
        let original = *self
            .entries
            .iter()
            .find(|entry| !entry.is_mirror && entry.contains_logical(source))?;
        let mirror = original.mirror(logical_base);
        debug!(
            physical = %mirror.physical_base,
            logical = %mirror.logical_base,
            size = mirror.size,
            "mirror added"
        );
        self.push(mirror);
        Some(mirror)
    }

    /// Entry whose logical range contains `logical`
    pub fn entry_for(&self, logical: MemoryAddress) -> Option<&MemoryMapEntry> {
        let index = self
            .entries
            .partition_point(|entry| entry.logical_base <= logical);
        self.entries[..index]
            .iter()
            .rev()
            .find(|entry| entry.contains_logical(logical))
    }

    /// Physical address backing `logical`
    pub fn translate(&self, logical: MemoryAddress) -> Option<MemoryAddress> {
        self.entry_for(logical)?.translate(logical)
    }

    /// Every logical address at which the byte at `physical` is visible
    pub fn aliases_of(&self, physical: MemoryAddress) -> Vec<MemoryAddress> {
        self.entries
            .iter()
            .filter_map(|entry| {
                let offset = physical.offset_from(entry.physical_base)?;
                (offset < entry.size).then(|| entry.logical_base.wrapping_add(offset))
            })
            .collect()
    }

    pub fn entries(&self) -> &[MemoryMapEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bytes covered by non-mirror entries
    pub fn physical_size(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| !entry.is_mirror)
            .map(|entry| entry.size)
            .sum()
    }
}
