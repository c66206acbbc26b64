//! Windows API bindings
//!
//! Low-level FFI wrappers over kernel32 and psapi.

pub mod kernel32;
pub mod psapi;
