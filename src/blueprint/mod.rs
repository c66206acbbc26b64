//! Blueprint recognizers and their registry
//!
//! A blueprint inspects bytes at a candidate address through a
//! [`TargetBackend`] and decides whether they form an instance of a known
//! structural shape. Concrete blueprints live outside this crate; each exposes
//! a registration function that the host runs once at startup:
//!
//! ```
//! use xenoscan::blueprint::{Blueprint, BlueprintKey, BlueprintRegistry, Recognition};
//! use xenoscan::core::{MemoryAddress, MemoryInformation};
//! use xenoscan::target::TargetBackend;
//!
//! #[derive(Default)]
//! struct NullPointer;
//!
//! impl Blueprint for NullPointer {
//!     fn key(&self) -> BlueprintKey {
//!         BlueprintKey::new("nullptr")
//!     }
//!     fn candidate_size(&self, pointer_size: usize) -> usize {
//!         pointer_size
//!     }
//!     fn recognize(
//!         &self,
//!         target: &dyn TargetBackend,
//!         _region: &MemoryInformation,
//!         address: MemoryAddress,
//!     ) -> Option<Recognition> {
//!         let value = target.read_pointer(address).ok()?;
//!         value
//!             .is_null()
//!             .then(|| Recognition::new(self.key(), address, target.pointer_size()))
//!     }
//! }
//!
//! fn register_null_pointer(registry: &mut BlueprintRegistry) {
//!     xenoscan::blueprint::register_blueprint::<NullPointer>(registry);
//! }
//!
//! let registry = BlueprintRegistry::from_registrations(&[register_null_pointer]);
//! assert!(registry.create_instance(&BlueprintKey::new("nullptr")).is_some());
//! ```

use crate::core::types::{MemoryAddress, MemoryInformation};
use crate::registry::KeyedRegistry;
use crate::target::TargetBackend;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Identity token of a blueprint type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct BlueprintKey(&'static str);

impl BlueprintKey {
    /// `std::list` node chains
    pub const STD_LIST: Self = BlueprintKey("stdlist");
    /// `std::map` red-black trees
    pub const STD_MAP: Self = BlueprintKey("stdmap");
    /// Native class instances identified by their vtable
    pub const NATIVE_CLASS_INSTANCE: Self = BlueprintKey("nativeclass");

    pub const fn new(name: &'static str) -> Self {
        BlueprintKey(name)
    }

    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for BlueprintKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A value a blueprint recognized in target memory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recognition {
    pub blueprint: BlueprintKey,
    pub address: MemoryAddress,
    pub size: usize,
}

impl Recognition {
    pub fn new(blueprint: BlueprintKey, address: MemoryAddress, size: usize) -> Self {
        Recognition {
            blueprint,
            address,
            size,
        }
    }
}

/// Value-recognizer capability
pub trait Blueprint: Send + Sync {
    /// Key this blueprint registers under
    fn key(&self) -> BlueprintKey;

    /// Minimum number of bytes a candidate occupies for a target with the
    /// given pointer width
    fn candidate_size(&self, pointer_size: usize) -> usize;

    /// Tests the candidate at `address` inside `region`, reading through `target`
    fn recognize(
        &self,
        target: &dyn TargetBackend,
        region: &MemoryInformation,
        address: MemoryAddress,
    ) -> Option<Recognition>;
}

/// Registry of every blueprint known to the process
pub type BlueprintRegistry = KeyedRegistry<BlueprintKey, dyn Blueprint>;

/// Registers `T` under the key its default instance reports
pub fn register_blueprint<T>(registry: &mut BlueprintRegistry) -> bool
where
    T: Blueprint + Default + 'static,
{
    let key = T::default().key();
    registry.register_fn(key, || Arc::new(T::default()) as Arc<dyn Blueprint>)
}

/// Registered blueprints the target declares it can be scanned for, sorted
pub fn compatible_keys(
    registry: &BlueprintRegistry,
    target: &dyn TargetBackend,
) -> BTreeSet<BlueprintKey> {
    registry
        .keys()
        .into_iter()
        .filter(|key| target.supports_blueprint(key))
        .collect()
}
