//! Kernel32.dll bindings for process, memory, thread and timing operations

use crate::core::types::{MemoryAddress, ProcessId, TargetError, TargetResult};
use std::ffi::CString;
use std::mem;
use winapi::shared::minwindef::{DWORD, FALSE, FILETIME, HMODULE, LPCVOID, LPVOID};
use winapi::shared::winerror::ERROR_ACCESS_DENIED;
use winapi::um::errhandlingapi::GetLastError;
use winapi::um::handleapi::CloseHandle;
use winapi::um::libloaderapi::{GetModuleHandleA, GetProcAddress};
use winapi::um::memoryapi::{ReadProcessMemory, VirtualQueryEx, WriteProcessMemory};
use winapi::um::minwinbase::LPTHREAD_START_ROUTINE;
use winapi::um::processthreadsapi::{
    CreateRemoteThread, GetExitCodeThread, GetProcessHandleCount, OpenProcess,
};
use winapi::um::synchapi::WaitForSingleObject;
use winapi::um::sysinfoapi::{GetSystemInfo, GetSystemTimeAsFileTime, GetTickCount, SYSTEM_INFO};
use winapi::um::winbase::{INFINITE, WAIT_OBJECT_0};
use winapi::um::winnt::{HANDLE, MEMORY_BASIC_INFORMATION};

/// Safe wrapper for OpenProcess
pub fn open_process(pid: ProcessId, desired_access: DWORD) -> TargetResult<HANDLE> {
    unsafe {
        let handle = OpenProcess(desired_access, FALSE, pid);
        if !handle.is_null() {
            return Ok(handle);
        }
        if GetLastError() == ERROR_ACCESS_DENIED {
            Err(TargetError::access_denied(pid, "OpenProcess was refused"))
        } else {
            Err(TargetError::ProcessNotFound(pid))
        }
    }
}

/// Safe wrapper for CloseHandle
///
/// # Safety
/// The handle must be a valid Windows handle owned by the caller
pub unsafe fn close_handle(handle: HANDLE) -> bool {
    handle.is_null() || CloseHandle(handle) != FALSE
}

/// Safe wrapper for ReadProcessMemory; a short copy is an error
///
/// # Safety
/// The handle must be a valid process handle with `PROCESS_VM_READ`
pub unsafe fn read_process_memory(
    handle: HANDLE,
    address: MemoryAddress,
    buffer: &mut [u8],
) -> TargetResult<()> {
    let mut bytes_read = 0;

    let result = ReadProcessMemory(
        handle,
        address.as_usize() as LPCVOID,
        buffer.as_mut_ptr() as LPVOID,
        buffer.len(),
        &mut bytes_read,
    );

    if result == FALSE {
        Err(TargetError::read_failed(address, buffer.len()))
    } else if bytes_read != buffer.len() {
        Err(TargetError::partial_transfer(address, buffer.len(), bytes_read))
    } else {
        Ok(())
    }
}

/// Safe wrapper for WriteProcessMemory; a short copy is an error
///
/// # Safety
/// The handle must be a valid process handle with `PROCESS_VM_WRITE`
pub unsafe fn write_process_memory(
    handle: HANDLE,
    address: MemoryAddress,
    data: &[u8],
) -> TargetResult<()> {
    let mut bytes_written = 0;

    let result = WriteProcessMemory(
        handle,
        address.as_usize() as LPVOID,
        data.as_ptr() as LPCVOID,
        data.len(),
        &mut bytes_written,
    );

    if result == FALSE {
        Err(TargetError::write_failed(address, data.len()))
    } else if bytes_written != data.len() {
        Err(TargetError::partial_transfer(address, data.len(), bytes_written))
    } else {
        Ok(())
    }
}

/// Safe wrapper for VirtualQueryEx; `None` when the address cannot be described
///
/// # Safety
/// The handle must be a valid process handle with `PROCESS_QUERY_INFORMATION`
pub unsafe fn virtual_query_ex(
    handle: HANDLE,
    address: MemoryAddress,
) -> Option<MEMORY_BASIC_INFORMATION> {
    let mut mbi: MEMORY_BASIC_INFORMATION = mem::zeroed();

    let result = VirtualQueryEx(
        handle,
        address.as_usize() as LPCVOID,
        &mut mbi,
        mem::size_of::<MEMORY_BASIC_INFORMATION>(),
    );

    (result != 0).then_some(mbi)
}

/// Safe wrapper for GetSystemInfo
pub fn get_system_info() -> SYSTEM_INFO {
    unsafe {
        let mut info: SYSTEM_INFO = mem::zeroed();
        GetSystemInfo(&mut info);
        info
    }
}

/// Current system time as a 64-bit FILETIME value
pub fn get_system_time_as_file_time() -> u64 {
    unsafe {
        let mut time: FILETIME = mem::zeroed();
        GetSystemTimeAsFileTime(&mut time);
        ((time.dwHighDateTime as u64) << 32) | time.dwLowDateTime as u64
    }
}

/// Milliseconds since boot, wrapping every ~49.7 days
pub fn get_tick_count() -> u32 {
    unsafe { GetTickCount() }
}

/// Base of a module already loaded in this process
pub fn get_module_handle(name: &str) -> Option<HMODULE> {
    let name = CString::new(name).ok()?;
    let module = unsafe { GetModuleHandleA(name.as_ptr()) };
    (!module.is_null()).then_some(module)
}

/// Address of an exported function
///
/// # Safety
/// `module` must be a module handle loaded in this process
pub unsafe fn get_proc_address(module: HMODULE, name: &str) -> Option<usize> {
    let name = CString::new(name).ok()?;
    let address = GetProcAddress(module, name.as_ptr());
    (!address.is_null()).then(|| address as usize)
}

/// Starts a thread inside `process` at `start_address`
///
/// # Safety
/// The handle must carry `PROCESS_CREATE_THREAD`, and `start_address` must be
/// a function with the thread-start signature mapped in the target
pub unsafe fn create_remote_thread(
    process: HANDLE,
    start_address: usize,
    parameter: usize,
) -> TargetResult<HANDLE> {
    let routine: LPTHREAD_START_ROUTINE = Some(mem::transmute::<
        usize,
        unsafe extern "system" fn(LPVOID) -> DWORD,
    >(start_address));

    let thread = CreateRemoteThread(
        process,
        std::ptr::null_mut(),
        0,
        routine,
        parameter as LPVOID,
        0,
        std::ptr::null_mut(),
    );

    if thread.is_null() {
        Err(TargetError::module_resolution("CreateRemoteThread failed"))
    } else {
        Ok(thread)
    }
}

/// Blocks until `handle` is signalled
///
/// # Safety
/// The handle must be a valid waitable handle
pub unsafe fn wait_for_single_object(handle: HANDLE) -> bool {
    WaitForSingleObject(handle, INFINITE) == WAIT_OBJECT_0
}

/// Exit code of a finished thread
///
/// # Safety
/// The handle must be a valid thread handle
pub unsafe fn get_exit_code_thread(thread: HANDLE) -> Option<u32> {
    let mut code: DWORD = 0;
    (GetExitCodeThread(thread, &mut code) != FALSE).then_some(code)
}

/// Number of handles open in `process`
///
/// # Safety
/// The handle must be a valid process handle
pub unsafe fn get_process_handle_count(process: HANDLE) -> Option<u32> {
    let mut count: DWORD = 0;
    (GetProcessHandleCount(process, &mut count) != FALSE).then_some(count)
}
