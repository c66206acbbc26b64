//! Core module containing the address-space value types
//!
//! Everything here is plain data: addresses, region descriptors, mapping
//! entries and error types. Backends produce these; scanners consume them.

pub mod types;

pub use types::{
    MemoryAddress, MemoryInformation, MemoryMapEntry, ModuleBounds, ProcessId, TargetError,
    TargetResult,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");
