//! Blueprint registry behaviour through the public API

use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::sync::Arc;
use xenoscan::blueprint::{compatible_keys, register_blueprint};
use xenoscan::registry::Registration;
use xenoscan::target::mock::MockTarget;
use xenoscan::{
    Blueprint, BlueprintKey, BlueprintRegistry, MemoryAddress, MemoryInformation, Recognition,
    TargetBackend,
};

/// Recognises a pointer-sized cell that points at itself
#[derive(Default)]
struct SelfLoop;

impl Blueprint for SelfLoop {
    fn key(&self) -> BlueprintKey {
        BlueprintKey::STD_LIST
    }

    fn candidate_size(&self, pointer_size: usize) -> usize {
        pointer_size
    }

    fn recognize(
        &self,
        target: &dyn TargetBackend,
        _region: &MemoryInformation,
        address: MemoryAddress,
    ) -> Option<Recognition> {
        let next = target.read_pointer(address).ok()?;
        (next == address).then(|| {
            Recognition::new(self.key(), address, self.candidate_size(target.pointer_size()))
        })
    }
}

#[derive(Default)]
struct NullCell;

impl Blueprint for NullCell {
    fn key(&self) -> BlueprintKey {
        BlueprintKey::new("nullcell")
    }

    fn candidate_size(&self, pointer_size: usize) -> usize {
        pointer_size
    }

    fn recognize(
        &self,
        target: &dyn TargetBackend,
        _region: &MemoryInformation,
        address: MemoryAddress,
    ) -> Option<Recognition> {
        let value = target.read_pointer(address).ok()?;
        value
            .is_null()
            .then(|| Recognition::new(self.key(), address, target.pointer_size()))
    }
}

fn register_self_loop(registry: &mut BlueprintRegistry) {
    register_blueprint::<SelfLoop>(registry);
}

fn register_null_cell(registry: &mut BlueprintRegistry) {
    register_blueprint::<NullCell>(registry);
}

#[test]
fn test_keys_sorted_regardless_of_registration_order() {
    let forward: &[Registration<BlueprintKey, dyn Blueprint>] =
        &[register_self_loop, register_null_cell];
    let backward: &[Registration<BlueprintKey, dyn Blueprint>] =
        &[register_null_cell, register_self_loop];

    let a = BlueprintRegistry::from_registrations(forward);
    let b = BlueprintRegistry::from_registrations(backward);

    let expected: Vec<BlueprintKey> = vec![BlueprintKey::new("nullcell"), BlueprintKey::STD_LIST];
    assert_eq!(a.keys().into_iter().collect::<Vec<_>>(), expected);
    assert_eq!(a.keys(), b.keys());
}

#[test]
fn test_recognise_in_mock_target() {
    let target = MockTarget::attached_with_page(0x40000, 0x1000);
    let cell = MemoryAddress::new(0x40100);
    let width = target.pointer_size();
    target.raw_write(cell, &cell.as_usize().to_ne_bytes()[..width]).unwrap();

    let registry = BlueprintRegistry::from_registrations(&[register_self_loop, register_null_cell]);
    let region = match target.query_memory(cell) {
        xenoscan::RegionQuery::Region(region) => region,
        xenoscan::RegionQuery::Gap { .. } => panic!("page is mapped"),
    };

    let list = registry.create_instance(&BlueprintKey::STD_LIST).unwrap();
    let found = list.recognize(&target, &region, cell).unwrap();
    assert_eq!(found.address, cell);
    assert_eq!(found.size, width);
    assert!(list.recognize(&target, &region, MemoryAddress::new(0x40200)).is_none());

    let null = registry
        .create_instance(&BlueprintKey::new("nullcell"))
        .unwrap();
    assert!(null.recognize(&target, &region, MemoryAddress::new(0x40200)).is_some());
}

#[test]
fn test_unknown_key_has_no_instance() {
    let registry = BlueprintRegistry::from_registrations(&[register_self_loop]);
    assert!(registry.create_instance(&BlueprintKey::STD_MAP).is_none());
}

#[test]
fn test_instances_are_independent() {
    let registry = BlueprintRegistry::from_registrations(&[register_self_loop]);
    let first = registry.create_instance(&BlueprintKey::STD_LIST).unwrap();
    let second = registry.create_instance(&BlueprintKey::STD_LIST).unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
}

#[test]
fn test_later_registration_wins() {
    let mut registry = BlueprintRegistry::new();
    assert!(!registry.register_fn(BlueprintKey::STD_LIST, || {
        Arc::new(NullCell) as Arc<dyn Blueprint>
    }));
    assert!(registry.register_fn(BlueprintKey::STD_LIST, || {
        Arc::new(SelfLoop) as Arc<dyn Blueprint>
    }));
    assert_eq!(registry.len(), 1);

    let instance = registry.create_instance(&BlueprintKey::STD_LIST).unwrap();
    assert_eq!(instance.key(), BlueprintKey::STD_LIST);
}

#[test]
fn test_compatible_keys_filter_by_target() {
    let target = MockTarget::attached_with_page(0x40000, 0x1000);
    let registry = BlueprintRegistry::from_registrations(&[register_self_loop, register_null_cell]);

    let expected: BTreeSet<BlueprintKey> = [BlueprintKey::STD_LIST].into_iter().collect();
    assert_eq!(compatible_keys(&registry, &target), expected);
}
