//! xenoscan: process-memory introspection core
//!
//! Attaches to a live process, walks its address space region by region,
//! reads and writes its memory, and hosts a registry of blueprints that
//! recognise runtime data structures inside scanned regions.
//!
//! - [`target`]: the [`TargetBackend`] contract, the in-memory mock and the
//!   platform backend for the compiling OS
//! - [`memory`]: region walking, parallel dispatch and logical mapping
//! - [`registry`] / [`blueprint`]: keyed producer registries
//! - [`config`]: TOML configuration with defaults and validation

pub mod blueprint;
pub mod config;
pub mod core;
pub mod memory;
pub mod probe;
pub mod registry;
pub mod target;

#[cfg(target_os = "linux")]
pub mod linux;
#[cfg(windows)]
pub mod windows;

pub use blueprint::{Blueprint, BlueprintKey, BlueprintRegistry, Recognition};
pub use core::types::{
    MemoryAddress, MemoryInformation, MemoryMapEntry, ModuleBounds, ProcessId, TargetError,
    TargetResult,
};
pub use core::{AUTHORS, VERSION};
pub use memory::{MemoryMap, RegionWalker};
pub use registry::{KeyedProducer, KeyedRegistry};
pub use target::{platform_target, RegionQuery, TargetBackend};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_constants() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
        assert_eq!(AUTHORS, env!("CARGO_PKG_AUTHORS"));
    }

    #[test]
    fn test_address_reexport() {
        let address = MemoryAddress::new(0x1000);
        assert_eq!(address.as_usize(), 0x1000);
        assert!(MemoryAddress::null().is_null());
    }

    #[test]
    fn test_error_reexport() {
        let result: TargetResult<u32> = Err(TargetError::NotAttached);
        assert!(result.is_err());
        assert!(TargetError::ProcessNotFound(7).to_string().contains('7'));
    }

    #[test]
    fn test_native_keys_are_exposed() {
        assert_eq!(BlueprintKey::STD_LIST.as_str(), "stdlist");
        assert_eq!(BlueprintKey::STD_MAP.as_str(), "stdmap");
        assert_eq!(BlueprintKey::NATIVE_CLASS_INSTANCE.as_str(), "nativeclass");
    }
}
