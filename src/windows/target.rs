//! [`TargetBackend`] over the Win32 process and virtual-memory APIs

use super::bindings::kernel32;
use super::module_base::{default_resolvers, resolve_main_module, ModuleBaseResolver};
use super::types::{region_from_basic_info, ProcessHandle};
use crate::blueprint::BlueprintKey;
use crate::core::types::{MemoryAddress, ModuleBounds, ProcessId, TargetError, TargetResult};
use crate::target::{native_blueprints, require_attached, RegionQuery, TargetBackend};
use lazy_static::lazy_static;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Page size and user address range, queried once per process
#[derive(Debug, Clone, Copy)]
struct SystemLimits {
    page_size: usize,
    lowest: MemoryAddress,
    highest: MemoryAddress,
}

lazy_static! {
    static ref SYSTEM_LIMITS: SystemLimits = {
        let info = kernel32::get_system_info();
        SystemLimits {
            page_size: info.dwPageSize as usize,
            lowest: MemoryAddress::new(info.lpMinimumApplicationAddress as usize),
            highest: MemoryAddress::new(info.lpMaximumApplicationAddress as usize),
        }
    };
}

/// Backend for a process on the local Windows machine
pub struct WindowsTarget {
    process: Option<ProcessHandle>,
    main_module: Option<ModuleBounds>,
    supported: BTreeSet<BlueprintKey>,
    resolvers: Vec<Box<dyn ModuleBaseResolver>>,
}

impl WindowsTarget {
    pub fn new() -> Self {
        Self::with_resolvers(default_resolvers())
    }

    /// Backend that locates the main module with `resolvers`, in order
    pub fn with_resolvers(resolvers: Vec<Box<dyn ModuleBaseResolver>>) -> Self {
        WindowsTarget {
            process: None,
            main_module: None,
            supported: native_blueprints(),
            resolvers,
        }
    }

    pub fn pid(&self) -> Option<ProcessId> {
        self.process.as_ref().map(ProcessHandle::pid)
    }

    fn attached_process(&self) -> TargetResult<&ProcessHandle> {
        require_attached(self.process.is_some())?;
        self.process.as_ref().ok_or(TargetError::NotAttached)
    }
}

impl Default for WindowsTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetBackend for WindowsTarget {
    fn attach(&mut self, pid: ProcessId) -> TargetResult<()> {
        self.detach();

        let process = ProcessHandle::open_for_scanning(pid)?;
        // process is dropped, closing its handle, if resolution fails
        let bounds = resolve_main_module(&process, &self.resolvers)?;

        info!(pid, base = %bounds.start, size = bounds.size(), "attached to process");
        self.process = Some(process);
        self.main_module = Some(bounds);
        Ok(())
    }

    fn detach(&mut self) {
        if let Some(process) = self.process.take() {
            debug!(pid = process.pid(), "detached from process");
        }
        self.main_module = None;
    }

    fn is_attached(&self) -> bool {
        self.process.is_some()
    }

    fn query_memory(&self, address: MemoryAddress) -> RegionQuery {
        let Ok(process) = self.attached_process() else {
            return RegionQuery::gap_after(address, self.page_size());
        };

        match unsafe { kernel32::virtual_query_ex(process.raw(), address) } {
            Some(mbi) if mbi.RegionSize > 0 => RegionQuery::Region(region_from_basic_info(&mbi)),
            _ => RegionQuery::gap_after(address, self.page_size()),
        }
    }

    fn main_module_bounds(&self) -> Option<ModuleBounds> {
        self.main_module
    }

    fn raw_read(&self, address: MemoryAddress, buffer: &mut [u8]) -> TargetResult<()> {
        self.attached_process()?.read_memory(address, buffer)
    }

    fn raw_write(&self, address: MemoryAddress, data: &[u8]) -> TargetResult<()> {
        self.attached_process()?.write_memory(address, data)
    }

    fn file_time_64(&self) -> u64 {
        kernel32::get_system_time_as_file_time()
    }

    fn tick_time_32(&self) -> u32 {
        kernel32::get_tick_count()
    }

    fn page_size(&self) -> usize {
        SYSTEM_LIMITS.page_size
    }

    fn lowest_address(&self) -> MemoryAddress {
        SYSTEM_LIMITS.lowest
    }

    fn highest_address(&self) -> MemoryAddress {
        SYSTEM_LIMITS.highest
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
