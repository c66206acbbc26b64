//! Main-module bounds cached by a backend at attach time

use super::address::MemoryAddress;
use serde::{Deserialize, Serialize};

/// Half-open address range `[start, end)` occupied by a loaded image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleBounds {
    pub start: MemoryAddress,
    pub end: MemoryAddress,
}

impl ModuleBounds {
    /// Creates bounds from a base address and image size
    pub fn new(start: MemoryAddress, size: usize) -> Self {
        ModuleBounds {
            start,
            end: start.saturating_add(size),
        }
    }

    /// Size of the image in bytes
    pub fn size(&self) -> usize {
        self.end.as_usize().saturating_sub(self.start.as_usize())
    }

    /// Checks if an address is within the image
    pub fn contains(&self, address: MemoryAddress) -> bool {
        address >= self.start && address < self.end
    }
}
