//! Target-process abstraction
//!
//! [`TargetBackend`] is the contract every platform backend implements:
//! attach/detach, region queries, raw cross-process reads and writes, and
//! timing. Read-side operations take `&self` so one attached backend can be
//! shared across scanning workers; attach and detach take `&mut self`.
//!
//! Region enumeration is driven by the caller: start at
//! [`lowest_address`](TargetBackend::lowest_address), follow
//! [`RegionQuery::next_address`], and stop once past
//! [`highest_address`](TargetBackend::highest_address).

pub mod mock;
pub mod time;
pub mod unsupported;

use crate::blueprint::BlueprintKey;
use crate::core::types::{
    MemoryAddress, MemoryInformation, ModuleBounds, ProcessId, TargetError, TargetResult,
};
use std::collections::BTreeSet;

#[cfg(target_os = "linux")]
pub use crate::linux::LinuxTarget as PlatformTarget;
#[cfg(windows)]
pub use crate::windows::WindowsTarget as PlatformTarget;

/// Outcome of a region query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionQuery {
    /// The region containing the queried address
    Region(MemoryInformation),
    /// Nothing could be reported; `next` is strictly past the queried address
    Gap { next: MemoryAddress },
}

impl RegionQuery {
    /// Gap whose successor is one page past `address`
    pub fn gap_after(address: MemoryAddress, page_size: usize) -> Self {
        RegionQuery::Gap {
            next: address.saturating_add(page_size.max(1)),
        }
    }

    /// Where a linear walk should continue
    pub fn next_address(&self) -> MemoryAddress {
        match self {
            RegionQuery::Region(info) => info.allocation_end,
            RegionQuery::Gap { next } => *next,
        }
    }

    pub fn region(&self) -> Option<&MemoryInformation> {
        match self {
            RegionQuery::Region(info) => Some(info),
            RegionQuery::Gap { .. } => None,
        }
    }

    pub fn is_gap(&self) -> bool {
        matches!(self, RegionQuery::Gap { .. })
    }
}

/// A live view of another process's memory
pub trait TargetBackend: Send + Sync {
    /// Attaches to `pid`, releasing any previous attachment first.
    ///
    /// On failure the backend is left unattached.
    fn attach(&mut self, pid: ProcessId) -> TargetResult<()>;

    /// Releases the OS handle; a no-op when unattached
    fn detach(&mut self);

    fn is_attached(&self) -> bool;

    /// Reports the region containing `address`
    fn query_memory(&self, address: MemoryAddress) -> RegionQuery;

    /// Main-module range cached by `attach`
    fn main_module_bounds(&self) -> Option<ModuleBounds>;

    /// Copies `buffer.len()` bytes from `address`.
    ///
    /// On error the contents of `buffer` are unspecified.
    fn raw_read(&self, address: MemoryAddress, buffer: &mut [u8]) -> TargetResult<()>;

    /// Copies `data` into the target at `address`
    fn raw_write(&self, address: MemoryAddress, data: &[u8]) -> TargetResult<()>;

    /// Wall-clock time in 100 ns ticks since 1601-01-01 UTC
    fn file_time_64(&self) -> u64;

    /// Milliseconds since boot, wrapping
    fn tick_time_32(&self) -> u32;

    fn page_size(&self) -> usize;

    fn lowest_address(&self) -> MemoryAddress;

    fn highest_address(&self) -> MemoryAddress;

    /// Blueprints this backend can be scanned for
    fn supported_blueprints(&self) -> &BTreeSet<BlueprintKey>;

    fn pointer_size(&self) -> usize;

    fn is_little_endian(&self) -> bool;

    fn supports_blueprint(&self, key: &BlueprintKey) -> bool {
        self.supported_blueprints().contains(key)
    }

    /// Reads `len` bytes into a new buffer
    fn read_bytes(&self, address: MemoryAddress, len: usize) -> TargetResult<Vec<u8>> {
        let mut buffer = vec![0u8; len];
        self.raw_read(address, &mut buffer)?;
        Ok(buffer)
    }

    /// Reads one target pointer, honouring the target's width and byte order
    fn read_pointer(&self, address: MemoryAddress) -> TargetResult<MemoryAddress> {
        let bytes = self.read_bytes(address, self.pointer_size())?;
        MemoryAddress::from_bytes(&bytes, self.is_little_endian())
    }
}

/// Creates the backend for the compiling OS, unattached
#[cfg(any(windows, target_os = "linux"))]
pub fn platform_target() -> Box<dyn TargetBackend> {
    Box::new(PlatformTarget::new())
}

/// Creates the backend for the compiling OS; on hosts without one, every
/// attach fails with [`TargetError::UnsupportedPlatform`]
#[cfg(not(any(windows, target_os = "linux")))]
pub fn platform_target() -> Box<dyn TargetBackend> {
    Box::new(unsupported::UnsupportedTarget::new())
}

/// Blueprint keys every native backend can be scanned for
pub(crate) fn native_blueprints() -> BTreeSet<BlueprintKey> {
    [
        BlueprintKey::STD_LIST,
        BlueprintKey::STD_MAP,
        BlueprintKey::NATIVE_CLASS_INSTANCE,
    ]
    .into_iter()
    .collect()
}

/// Shared guard for read-side calls made while unattached
pub(crate) fn require_attached(attached: bool) -> TargetResult<()> {
    debug_assert!(attached, "target backend used while unattached");
    if attached {
        Ok(())
    } else {
        Err(TargetError::NotAttached)
    }
}
