//! Generic key-to-producer registry
//!
//! A [`KeyedRegistry`] maps keys to producers that each construct fresh,
//! shared-ownership instances of some base type `B` (usually a trait object).
//! Producers are added during an explicit initialization step, typically by
//! running a list of registration functions through
//! [`KeyedRegistry::from_registrations`], after which the registry is only
//! read. Nothing consuming the registry needs to know the concrete set of
//! producers at compile time.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Something that can build instances of `B` and names itself with a key
pub trait KeyedProducer<K, B: ?Sized>: Send + Sync {
    /// Key this producer registers under
    fn key(&self) -> &K;

    /// Constructs a new, independently owned instance
    fn create_instance(&self) -> Arc<B>;
}

/// Producer backed by a zero-argument constructor closure
pub struct FnProducer<K, B: ?Sized> {
    key: K,
    make: Box<dyn Fn() -> Arc<B> + Send + Sync>,
}

impl<K, B: ?Sized> FnProducer<K, B> {
    pub fn new<F>(key: K, make: F) -> Self
    where
        F: Fn() -> Arc<B> + Send + Sync + 'static,
    {
        FnProducer {
            key,
            make: Box::new(make),
        }
    }
}

impl<K, B> KeyedProducer<K, B> for FnProducer<K, B>
where
    K: Send + Sync,
    B: ?Sized,
{
    fn key(&self) -> &K {
        &self.key
    }

    fn create_instance(&self) -> Arc<B> {
        (self.make)()
    }
}

/// A registration step run during initialization
pub type Registration<K, B> = fn(&mut KeyedRegistry<K, B>);

/// Mapping from key to producer; at most one producer per key
pub struct KeyedRegistry<K, B: ?Sized> {
    producers: BTreeMap<K, Box<dyn KeyedProducer<K, B>>>,
}

impl<K, B> KeyedRegistry<K, B>
where
    K: Ord + Clone + fmt::Debug,
    B: ?Sized,
{
    /// Creates an empty registry
    pub fn new() -> Self {
        KeyedRegistry {
            producers: BTreeMap::new(),
        }
    }

    /// Builds a registry by running each registration step in order
    pub fn from_registrations(registrations: &[Registration<K, B>]) -> Self {
        let mut registry = Self::new();
        for register in registrations {
            register(&mut registry);
        }
        debug!(count = registry.len(), "registry initialized");
        registry
    }

    /// Inserts `producer` under its own key.
    ///
    /// A later registration for the same key replaces the earlier one; the
    /// return value reports whether that happened.
    pub fn register_producer<P>(&mut self, producer: P) -> bool
    where
        P: KeyedProducer<K, B> + 'static,
    {
        let key = producer.key().clone();
        let replaced = self.producers.insert(key.clone(), Box::new(producer)).is_some();
        if replaced {
            warn!(key = ?key, "producer replaced an earlier registration");
        }
        replaced
    }

    /// Registers a constructor closure under `key`
    pub fn register_fn<F>(&mut self, key: K, make: F) -> bool
    where
        K: Send + Sync + 'static,
        B: 'static,
        F: Fn() -> Arc<B> + Send + Sync + 'static,
    {
        self.register_producer(FnProducer::new(key, make))
    }

    /// Builds a fresh instance for `key`, or `None` if nothing is registered
    pub fn create_instance(&self, key: &K) -> Option<Arc<B>> {
        self.producers
            .get(key)
            .map(|producer| producer.create_instance())
    }

    /// Sorted snapshot of every registered key
    pub fn keys(&self) -> BTreeSet<K> {
        self.producers.keys().cloned().collect()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.producers.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.producers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.producers.is_empty()
    }
}

impl<K, B> Default for KeyedRegistry<K, B>
where
    K: Ord + Clone + fmt::Debug,
    B: ?Sized,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, B> fmt::Debug for KeyedRegistry<K, B>
where
    K: fmt::Debug,
    B: ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedRegistry")
            .field("keys", &self.producers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    trait Shape: Send + Sync {
        fn name(&self) -> &'static str;
        fn sides(&self) -> u32;
    }

    #[derive(Default)]
    struct Triangle;
    impl Shape for Triangle {
        fn name(&self) -> &'static str {
            "triangle"
        }
        fn sides(&self) -> u32 {
            3
        }
    }

    #[derive(Default)]
    struct Square;
    impl Shape for Square {
        fn name(&self) -> &'static str {
            "square"
        }
        fn sides(&self) -> u32 {
            4
        }
    }

    type ShapeRegistry = KeyedRegistry<&'static str, dyn Shape>;

    fn register_triangle(registry: &mut ShapeRegistry) {
        registry.register_fn("triangle", || Arc::new(Triangle));
    }

    fn register_square(registry: &mut ShapeRegistry) {
        registry.register_fn("square", || Arc::new(Square));
    }

    #[test]
    fn test_create_instance_matches_key() {
        let registry = ShapeRegistry::from_registrations(&[register_triangle, register_square]);

        for key in registry.keys() {
            let shape = registry.create_instance(&key).unwrap();
            assert_eq!(shape.name(), key);
        }
        assert_eq!(registry.create_instance(&"square").unwrap().sides(), 4);
    }

    #[test]
    fn test_unregistered_key_is_absent() {
        let registry = ShapeRegistry::from_registrations(&[register_triangle]);

        assert!(registry.create_instance(&"hexagon").is_none());
        assert!(!registry.keys().contains("hexagon"));
        assert!(!registry.contains_key(&"hexagon"));
    }

    #[test]
    fn test_last_registration_wins() {
        let mut registry = ShapeRegistry::new();
        assert!(!registry.register_fn("shape", || Arc::new(Triangle)));
        assert!(registry.register_fn("shape", || Arc::new(Square)));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.create_instance(&"shape").unwrap().sides(), 4);
    }

    #[test]
    fn test_instances_are_independent() {
        let registry = ShapeRegistry::from_registrations(&[register_square]);
        let a = registry.create_instance(&"square").unwrap();
        let b = registry.create_instance(&"square").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_keys_sorted_regardless_of_order() {
        let forward = ShapeRegistry::from_registrations(&[register_triangle, register_square]);
        let backward = ShapeRegistry::from_registrations(&[register_square, register_triangle]);

        let expected: Vec<&str> = vec!["square", "triangle"];
        assert_eq!(forward.keys().into_iter().collect::<Vec<_>>(), expected);
        assert_eq!(backward.keys(), forward.keys());
    }

    #[test]
    fn test_custom_producer() {
        struct Counting {
            key: &'static str,
        }
        impl KeyedProducer<&'static str, dyn Shape> for Counting {
            fn key(&self) -> &&'static str {
                &self.key
            }
            fn create_instance(&self) -> Arc<dyn Shape> {
                Arc::new(Triangle)
            }
        }

        let mut registry = ShapeRegistry::default();
        assert!(registry.is_empty());
        registry.register_producer(Counting { key: "custom" });
        assert_eq!(registry.create_instance(&"custom").unwrap().sides(), 3);
    }

    #[test]
    fn test_debug_lists_keys() {
        let registry = ShapeRegistry::from_registrations(&[register_triangle]);
        let debug = format!("{:?}", registry);
        assert!(debug.contains("KeyedRegistry"));
        assert!(debug.contains("triangle"));
    }
}
