//! Backend for hosts without a native implementation
//!
//! Every attach fails with [`TargetError::UnsupportedPlatform`], so callers see
//! the same contract as a refused attach on a supported OS: an error and an
//! unattached backend.

use super::{require_attached, RegionQuery, TargetBackend};
use crate::blueprint::BlueprintKey;
use crate::core::types::{MemoryAddress, ModuleBounds, ProcessId, TargetError, TargetResult};
use std::collections::BTreeSet;
use tracing::warn;

const PAGE_SIZE: usize = 0x1000;

/// [`TargetBackend`] that refuses to attach
#[derive(Debug, Default)]
pub struct UnsupportedTarget {
    supported: BTreeSet<BlueprintKey>,
}

impl UnsupportedTarget {
    pub fn new() -> Self {
        UnsupportedTarget::default()
    }

    fn platform() -> TargetError {
        TargetError::UnsupportedPlatform(std::env::consts::OS.to_string())
    }
}

impl TargetBackend for UnsupportedTarget {
    fn attach(&mut self, pid: ProcessId) -> TargetResult<()> {
        warn!(pid, os = std::env::consts::OS, "no process backend for this OS");
        Err(Self::platform())
    }

    fn detach(&mut self) {}

    fn is_attached(&self) -> bool {
        false
    }

    fn query_memory(&self, address: MemoryAddress) -> RegionQuery {
        let _ = require_attached(false);
        RegionQuery::gap_after(address, PAGE_SIZE)
    }

    fn main_module_bounds(&self) -> Option<ModuleBounds> {
        None
    }

    fn raw_read(&self, address: MemoryAddress, buffer: &mut [u8]) -> TargetResult<()> {
        require_attached(false)?;
        Err(TargetError::read_failed(address, buffer.len()))
    }

    fn raw_write(&self, address: MemoryAddress, data: &[u8]) -> TargetResult<()> {
        require_attached(false)?;
        Err(TargetError::write_failed(address, data.len()))
    }

    fn file_time_64(&self) -> u64 {
        super::time::system_file_time()
    }

    fn tick_time_32(&self) -> u32 {
        0
    }

    fn page_size(&self) -> usize {
        PAGE_SIZE
    }

    fn lowest_address(&self) -> MemoryAddress {
        MemoryAddress::new(PAGE_SIZE)
    }

    fn highest_address(&self) -> MemoryAddress {
        MemoryAddress::MAX
    }

    fn supported_blueprints(&self) -> &BTreeSet<BlueprintKey> {
        &self.supported
    }

    fn pointer_size(&self) -> usize {
        std::mem::size_of::<usize>()
    }

    fn is_little_endian(&self) -> bool {
        cfg!(target_endian = "little")
    }
}
