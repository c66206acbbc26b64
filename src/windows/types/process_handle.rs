//! Process handle opened with the rights a scanning backend needs

use crate::core::types::{MemoryAddress, ProcessId, TargetError, TargetResult};
use crate::windows::bindings::kernel32;
use crate::windows::types::Handle;
use std::fmt;
use winapi::um::winnt::{
    HANDLE, PROCESS_CREATE_THREAD, PROCESS_QUERY_INFORMATION, PROCESS_VM_OPERATION,
    PROCESS_VM_READ, PROCESS_VM_WRITE,
};

/// Access rights requested from OpenProcess
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessAccess {
    value: u32,
}

impl ProcessAccess {
    pub const QUERY_INFORMATION: Self = Self {
        value: PROCESS_QUERY_INFORMATION,
    };
    pub const VM_READ: Self = Self {
        value: PROCESS_VM_READ,
    };
    pub const VM_WRITE: Self = Self {
        value: PROCESS_VM_WRITE,
    };
    pub const VM_OPERATION: Self = Self {
        value: PROCESS_VM_OPERATION,
    };
    pub const CREATE_THREAD: Self = Self {
        value: PROCESS_CREATE_THREAD,
    };

    /// Rights for querying, reading, writing and running the module-base thread
    pub const SCANNER: Self = Self {
        value: PROCESS_VM_OPERATION
            | PROCESS_VM_READ
            | PROCESS_VM_WRITE
            | PROCESS_QUERY_INFORMATION
            | PROCESS_CREATE_THREAD,
    };

    pub fn combine(rights: &[Self]) -> Self {
        Self {
            value: rights.iter().fold(0, |value, right| value | right.value),
        }
    }

    pub fn contains(&self, other: Self) -> bool {
        self.value & other.value == other.value
    }

    pub fn value(&self) -> u32 {
        self.value
    }
}

/// Open handle to another process
pub struct ProcessHandle {
    handle: Handle,
    pid: ProcessId,
    access: ProcessAccess,
}

impl ProcessHandle {
    pub fn open(pid: ProcessId, access: ProcessAccess) -> TargetResult<Self> {
        let raw_handle = kernel32::open_process(pid, access.value())?;
        Ok(ProcessHandle {
            handle: Handle::new(raw_handle),
            pid,
            access,
        })
    }

    pub fn open_for_scanning(pid: ProcessId) -> TargetResult<Self> {
        Self::open(pid, ProcessAccess::SCANNER)
    }

    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    pub fn access(&self) -> ProcessAccess {
        self.access
    }

    /// Raw handle, valid while `self` lives
    pub fn raw(&self) -> HANDLE {
        self.handle.raw()
    }

    pub fn is_valid(&self) -> bool {
        !self.handle.is_null()
    }

    pub fn read_memory(&self, address: MemoryAddress, buffer: &mut [u8]) -> TargetResult<()> {
        if !self.is_valid() {
            return Err(TargetError::NotAttached);
        }
        unsafe { kernel32::read_process_memory(self.handle.raw(), address, buffer) }
    }

    pub fn write_memory(&self, address: MemoryAddress, data: &[u8]) -> TargetResult<()> {
        if !self.is_valid() {
            return Err(TargetError::NotAttached);
        }
        unsafe { kernel32::write_process_memory(self.handle.raw(), address, data) }
    }
}

impl fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("pid", &self.pid)
            .field("valid", &self.is_valid())
            .field("access", &format!("0x{:X}", self.access.value()))
            .finish()
    }
}
