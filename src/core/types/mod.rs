//! Address-space model shared by every backend
//!
//! Value types describing addresses, regions, logical/physical mappings and
//! the errors a backend may report. None of these hold OS resources.

mod address;
mod error;
mod map_entry;
mod memory_info;
mod module_bounds;

pub use address::MemoryAddress;
pub use error::{TargetError, TargetResult};
pub use map_entry::MemoryMapEntry;
pub use memory_info::MemoryInformation;
pub use module_bounds::ModuleBounds;

/// OS-assigned identifier of a running process
pub type ProcessId = u32;
