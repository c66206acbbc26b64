//! Windows-specific type wrappers

pub mod handle;
pub mod memory_info;
pub mod process_handle;

pub use handle::Handle;
pub use memory_info::region_from_basic_info;
pub use process_handle::{ProcessAccess, ProcessHandle};
