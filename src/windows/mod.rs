//! Windows backend
//!
//! Unsafe FFI is confined to [`bindings`]; [`WindowsTarget`] builds the
//! [`TargetBackend`](crate::target::TargetBackend) contract on top of the
//! owned handle types in [`types`].

pub mod bindings;
pub mod module_base;
pub mod target;
pub mod types;

pub use module_base::{ModuleBaseResolver, ModuleEnumResolver, RemoteThreadResolver};
pub use target::WindowsTarget;
pub use types::{Handle, ProcessAccess, ProcessHandle};
