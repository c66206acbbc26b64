//! Owned HANDLE that is closed exactly once

use crate::windows::bindings::kernel32;
use std::ptr;
use winapi::um::winnt::HANDLE;

/// RAII wrapper around a Windows HANDLE
pub struct Handle {
    handle: HANDLE,
}

impl Handle {
    /// Takes ownership of `handle`
    pub fn new(handle: HANDLE) -> Self {
        Handle { handle }
    }

    pub fn null() -> Self {
        Handle {
            handle: ptr::null_mut(),
        }
    }

    pub fn is_null(&self) -> bool {
        self.handle.is_null()
    }

    /// Borrowed raw handle, valid while `self` lives
    pub fn raw(&self) -> HANDLE {
        self.handle
    }

    /// Gives up ownership without closing
    pub fn take(mut self) -> HANDLE {
        let handle = self.handle;
        self.handle = ptr::null_mut();
        handle
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            unsafe {
                let _ = kernel32::close_handle(self.handle);
            }
            self.handle = ptr::null_mut();
        }
    }
}

// HANDLE values are process-wide and the kernel serialises access to them
unsafe impl Send for Handle {}
unsafe impl Sync for Handle {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::windows::bindings::kernel32::get_process_handle_count;
    use winapi::um::processthreadsapi::{GetCurrentProcess, GetCurrentProcessId};
    use winapi::um::winnt::PROCESS_QUERY_INFORMATION;

    #[test]
    fn test_null_handle() {
        let handle = Handle::null();
        assert!(handle.is_null());
        assert_eq!(handle.raw(), ptr::null_mut());
    }

    #[test]
    fn test_take_skips_close() {
        let handle = Handle::new(ptr::null_mut());
        assert_eq!(handle.take(), ptr::null_mut());
    }

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_drop_closes_handle() {
        let count = || unsafe { get_process_handle_count(GetCurrentProcess()).unwrap() };
        let pid = unsafe { GetCurrentProcessId() };

        let opened = kernel32::open_process(pid, PROCESS_QUERY_INFORMATION).unwrap();
        let handle = Handle::new(opened);
        assert!(!handle.is_null());
        let with_handle = count();

        drop(handle);
        assert!(count() < with_handle);
    }
}
