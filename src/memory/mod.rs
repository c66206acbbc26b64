//! Address-space walking and logical mapping
//!
//! This module provides the caller-driven region walk built on
//! [`TargetBackend::query_memory`](crate::target::TargetBackend::query_memory):
//! - [`RegionWalker`], a lazy iterator that never holds the whole map
//! - parallel per-region dispatch over a shared attached backend
//! - [`MemoryMap`], logical-to-physical translation with mirrors

pub mod map;
pub mod walker;

pub use map::MemoryMap;
pub use walker::{map_regions_parallel, readable_bytes, region_chunks, RegionWalker};
