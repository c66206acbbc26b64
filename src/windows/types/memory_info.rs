//! Translation of VirtualQueryEx results into [`MemoryInformation`]

use crate::core::types::{MemoryAddress, MemoryInformation};
use winapi::um::winnt::{
    MEMORY_BASIC_INFORMATION, MEM_COMMIT, PAGE_EXECUTE, PAGE_EXECUTE_READ, PAGE_EXECUTE_READWRITE,
    PAGE_EXECUTE_WRITECOPY, PAGE_READWRITE,
};

/// Low byte of a protection value; PAGE_GUARD, PAGE_NOCACHE and
/// PAGE_WRITECOMBINE live above it
const PROTECTION_MASK: u32 = 0xFF;

pub fn is_committed_state(state: u32) -> bool {
    state == MEM_COMMIT
}

/// Any of the PAGE_EXECUTE* protections
pub fn is_executable_protection(protect: u32) -> bool {
    matches!(
        protect & PROTECTION_MASK,
        PAGE_EXECUTE | PAGE_EXECUTE_READ | PAGE_EXECUTE_READWRITE | PAGE_EXECUTE_WRITECOPY
    )
}

/// Writable without copy-on-write
pub fn is_writeable_protection(protect: u32) -> bool {
    matches!(
        protect & PROTECTION_MASK,
        PAGE_EXECUTE_READWRITE | PAGE_READWRITE
    )
}

/// Region described by one VirtualQueryEx call
pub fn region_from_basic_info(mbi: &MEMORY_BASIC_INFORMATION) -> MemoryInformation {
    MemoryInformation::new(
        MemoryAddress::new(mbi.BaseAddress as usize),
        mbi.RegionSize,
        is_committed_state(mbi.State),
        is_executable_protection(mbi.Protect),
        is_writeable_protection(mbi.Protect),
    )
}
