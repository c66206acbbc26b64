//! [`TargetBackend`] over procfs and `process_vm_readv`/`process_vm_writev`
//!
//! The region map is re-read from `/proc/<pid>/maps` on every query. Holes
//! between mappings are reported as uncommitted regions spanning to the next
//! mapping, so a walk visits each hole once instead of page by page.

use super::maps::{image_range, parse_maps, MapsEntry};
use crate::blueprint::BlueprintKey;
use crate::core::types::{
    MemoryAddress, MemoryInformation, ModuleBounds, ProcessId, TargetError, TargetResult,
};
use crate::target::time::{system_file_time, wrap_ticks};
use crate::target::{native_blueprints, require_attached, RegionQuery, TargetBackend};
use lazy_static::lazy_static;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io;
use std::path::PathBuf;
use tracing::{debug, info};

/// Used when `/proc/sys/vm/mmap_min_addr` cannot be read
const DEFAULT_MMAP_MIN_ADDR: usize = 0x10000;

#[cfg(target_arch = "x86_64")]
const USER_SPACE_TOP: usize = 0x7FFF_FFFF_FFFF;
#[cfg(all(target_pointer_width = "64", not(target_arch = "x86_64")))]
const USER_SPACE_TOP: usize = 0xFFFF_FFFF_FFFF;
#[cfg(target_pointer_width = "32")]
const USER_SPACE_TOP: usize = 0xFFFF_FFFF;

#[derive(Debug, Clone, Copy)]
struct SystemLimits {
    page_size: usize,
    lowest: MemoryAddress,
    highest: MemoryAddress,
}

lazy_static! {
    static ref SYSTEM_LIMITS: SystemLimits = {
        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        let lowest = fs::read_to_string("/proc/sys/vm/mmap_min_addr")
            .ok()
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_MMAP_MIN_ADDR);
        SystemLimits {
            page_size: usize::try_from(page_size).unwrap_or(0x1000),
            lowest: MemoryAddress::new(lowest),
            highest: MemoryAddress::new(USER_SPACE_TOP),
        }
    };
}

struct Attachment {
    pid: ProcessId,
    /// Held open for the attachment's lifetime; opening it is the ptrace
    /// access check
    _memory: File,
}

/// Backend for a process on the local Linux machine
pub struct LinuxTarget {
    attachment: Option<Attachment>,
    main_module: Option<ModuleBounds>,
    supported: BTreeSet<BlueprintKey>,
}

impl LinuxTarget {
    pub fn new() -> Self {
        LinuxTarget {
            attachment: None,
            main_module: None,
            supported: native_blueprints(),
        }
    }

    pub fn pid(&self) -> Option<ProcessId> {
        self.attachment.as_ref().map(|attachment| attachment.pid)
    }

    fn attached_pid(&self) -> TargetResult<ProcessId> {
        require_attached(self.attachment.is_some())?;
        self.pid().ok_or(TargetError::NotAttached)
    }

    fn read_maps(pid: ProcessId) -> io::Result<Vec<MapsEntry>> {
        Ok(parse_maps(&fs::read_to_string(format!("/proc/{pid}/maps"))?))
    }

    fn open_error(pid: ProcessId, error: io::Error) -> TargetError {
        match error.kind() {
            io::ErrorKind::NotFound => TargetError::ProcessNotFound(pid),
            io::ErrorKind::PermissionDenied => {
                TargetError::access_denied(pid, format!("/proc/{pid}/mem: {error}"))
            }
            _ => TargetError::Io(error),
        }
    }

    fn region_at(&self, entries: &[MapsEntry], address: MemoryAddress) -> RegionQuery {
        let highest = self.highest_address();
        let addr = address.as_usize();

        match entries.iter().find(|entry| entry.end > addr) {
            Some(entry) if entry.start <= addr => RegionQuery::Region(MemoryInformation::new(
                MemoryAddress::new(entry.start),
                entry.size(),
                entry.is_accessible(),
                entry.executable,
                entry.writeable,
            )),
            next => {
                let hole_end = next
                    .map(|entry| entry.start)
                    .unwrap_or(usize::MAX)
                    .min(highest.as_usize().saturating_add(1));
                RegionQuery::Region(MemoryInformation::new(
                    address,
                    hole_end.saturating_sub(addr).max(1),
                    false,
                    false,
                    false,
                ))
            }
        }
    }
}

impl Default for LinuxTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetBackend for LinuxTarget {
    fn attach(&mut self, pid: ProcessId) -> TargetResult<()> {
        self.detach();

        if pid == 0 {
            return Err(TargetError::ProcessNotFound(pid));
        }

        let entries = Self::read_maps(pid).map_err(|e| Self::open_error(pid, e))?;
        let memory = File::options()
            .read(true)
            .write(true)
            .open(format!("/proc/{pid}/mem"))
            .map_err(|e| Self::open_error(pid, e))?;

        let exe: PathBuf = fs::read_link(format!("/proc/{pid}/exe"))
            .map_err(|e| TargetError::module_resolution(format!("/proc/{pid}/exe: {e}")))?;
        let (start, end) = image_range(&entries, &exe).ok_or_else(|| {
            TargetError::module_resolution(format!("{} is not mapped", exe.display()))
        })?;
        let bounds = ModuleBounds::new(MemoryAddress::new(start), end - start);

        info!(pid, base = %bounds.start, size = bounds.size(), "attached to process");
        debug!(exe = %exe.display(), regions = entries.len(), "main module resolved");

        self.attachment = Some(Attachment {
            pid,
            _memory: memory,
        });
        self.main_module = Some(bounds);
        Ok(())
    }

    fn detach(&mut self) {
        if let Some(attachment) = self.attachment.take() {
            debug!(pid = attachment.pid, "detached from process");
        }
        self.main_module = None;
    }

    fn is_attached(&self) -> bool {
        self.attachment.is_some()
    }

    fn query_memory(&self, address: MemoryAddress) -> RegionQuery {
        let page_size = self.page_size();
        let Ok(pid) = self.attached_pid() else {
            return RegionQuery::gap_after(address, page_size);
        };
        if address > self.highest_address() {
            return RegionQuery::gap_after(address, page_size);
        }

        match Self::read_maps(pid) {
            Ok(entries) => self.region_at(&entries, address),
            Err(_) => RegionQuery::gap_after(address, page_size),
        }
    }

    fn main_module_bounds(&self) -> Option<ModuleBounds> {
        self.main_module
    }

    fn raw_read(&self, address: MemoryAddress, buffer: &mut [u8]) -> TargetResult<()> {
        let pid = self.attached_pid()?;
        if buffer.is_empty() {
            return Ok(());
        }

        let local = libc::iovec {
            iov_base: buffer.as_mut_ptr() as *mut libc::c_void,
            iov_len: buffer.len(),
        };
        let remote = libc::iovec {
            iov_base: address.as_usize() as *mut libc::c_void,
            iov_len: buffer.len(),
        };

        let transferred =
            unsafe { libc::process_vm_readv(pid as libc::pid_t, &local, 1, &remote, 1, 0) };
        check_transfer(transferred, address, buffer.len(), TargetError::read_failed)
    }

    fn raw_write(&self, address: MemoryAddress, data: &[u8]) -> TargetResult<()> {
        let pid = self.attached_pid()?;
        if data.is_empty() {
            return Ok(());
        }

        let local = libc::iovec {
            iov_base: data.as_ptr() as *mut libc::c_void,
            iov_len: data.len(),
        };
        let remote = libc::iovec {
            iov_base: address.as_usize() as *mut libc::c_void,
            iov_len: data.len(),
        };

        let transferred =
            unsafe { libc::process_vm_writev(pid as libc::pid_t, &local, 1, &remote, 1, 0) };
        check_transfer(transferred, address, data.len(), TargetError::write_failed)
    }

    fn file_time_64(&self) -> u64 {
        system_file_time()
    }

    fn tick_time_32(&self) -> u32 {
        let mut now = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        unsafe {
            libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut now);
        }
        let millis = now.tv_sec as u128 * 1000 + now.tv_nsec as u128 / 1_000_000;
        wrap_ticks(millis)
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

fn check_transfer(
    transferred: isize,
    address: MemoryAddress,
    expected: usize,
    failed: fn(MemoryAddress, usize) -> TargetError,
) -> TargetResult<()> {
    match usize::try_from(transferred) {
        Err(_) | Ok(0) => Err(failed(address, expected)),
        Ok(actual) if actual != expected => {
            Err(TargetError::partial_transfer(address, expected, actual))
        }
        Ok(_) => Ok(()),
    }
}
