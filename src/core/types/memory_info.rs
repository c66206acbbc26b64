//! Region descriptors reported by a target backend

use super::address::MemoryAddress;
use serde::{Deserialize, Serialize};

/// One contiguous region of the target's address space, as reported by the OS.
///
/// `allocation_end` is always exactly `allocation_base + allocation_size`. A
/// size reaching past the top of the address space is clamped so the region
/// ends at `MemoryAddress::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryInformation {
    pub allocation_base: MemoryAddress,
    pub allocation_end: MemoryAddress,
    pub allocation_size: usize,
    pub is_committed: bool,
    pub is_executable: bool,
    pub is_writeable: bool,
    pub is_mirror: bool,
}

impl MemoryInformation {
    /// Describes a backend-reported region. Such regions are never mirrors.
    pub fn new(
        allocation_base: MemoryAddress,
        allocation_size: usize,
        is_committed: bool,
        is_executable: bool,
        is_writeable: bool,
    ) -> Self {
        let allocation_size = clamp_size(allocation_base, allocation_size);
        MemoryInformation {
            allocation_base,
            allocation_end: allocation_base.wrapping_add(allocation_size),
            allocation_size,
            is_committed,
            is_executable,
            is_writeable,
            is_mirror: false,
        }
    }

    /// A synthetic alias of this region exposed at `logical_base`; the size
    /// shrinks if the alias would run past the top of the address space
    pub fn as_mirror_at(&self, logical_base: MemoryAddress) -> Self {
        let allocation_size = clamp_size(logical_base, self.allocation_size);
        MemoryInformation {
            allocation_base: logical_base,
            allocation_end: logical_base.wrapping_add(allocation_size),
            allocation_size,
            is_mirror: true,
            ..*self
        }
    }

    /// Half-open containment check
    pub fn contains(&self, address: MemoryAddress) -> bool {
        address >= self.allocation_base && address < self.allocation_end
    }

    /// Whether a blueprint scan should visit this region
    pub fn is_scannable(&self) -> bool {
        self.is_committed && !self.is_mirror && self.allocation_size > 0
    }
}

/// Largest size not exceeding `size` that fits above `base`
pub(crate) fn clamp_size(base: MemoryAddress, size: usize) -> usize {
    size.min(usize::MAX - base.as_usize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemoryInformation {
        MemoryInformation::new(MemoryAddress::new(0x1000), 0x2000, true, false, true)
    }

    #[test]
    fn test_end_is_derived() {
        let info = sample();
        assert_eq!(info.allocation_end, MemoryAddress::new(0x3000));
        assert!(!info.is_mirror);
    }

    #[test]
    fn test_contains_is_half_open() {
        let info = sample();
        assert!(info.contains(MemoryAddress::new(0x1000)));
        assert!(info.contains(MemoryAddress::new(0x2FFF)));
        assert!(!info.contains(MemoryAddress::new(0x3000)));
        assert!(!info.contains(MemoryAddress::new(0x0FFF)));
    }

    #[test]
    fn test_mirror_keeps_size_and_flags() {
        let mirror = sample().as_mirror_at(MemoryAddress::new(0x8000));
        assert!(mirror.is_mirror);
        assert_eq!(mirror.allocation_size, 0x2000);
        assert_eq!(mirror.allocation_end, MemoryAddress::new(0xA000));
        assert!(mirror.is_writeable);
        assert!(!mirror.is_scannable());
    }

    #[test]
    fn test_size_clamped_at_top_of_address_space() {
        let base = MemoryAddress::new(usize::MAX - 0xFFF);
        let info = MemoryInformation::new(base, 0x2000, true, false, false);
        assert_eq!(info.allocation_size, 0xFFF);
        assert_eq!(info.allocation_end, MemoryAddress::MAX);
        assert_eq!(
            info.allocation_end.as_usize() - info.allocation_base.as_usize(),
            info.allocation_size
        );

        let mirror = sample().as_mirror_at(MemoryAddress::new(usize::MAX - 0x800));
        assert_eq!(mirror.allocation_size, 0x800);
        assert_eq!(mirror.allocation_end, MemoryAddress::MAX);
    }

    #[test]
    fn test_scannable() {
        assert!(sample().is_scannable());

        let reserved = MemoryInformation::new(MemoryAddress::new(0x1000), 0x1000, false, false, false);
        assert!(!reserved.is_scannable());
    }
}
