//! In-memory backend for exercising scanners and blueprints without a live process
//!
//! Regions are laid out explicitly with [`MockTarget::map_region`]. Queries on
//! unmapped addresses report a one-page [`RegionQuery::Gap`], which is how the
//! walker's forward-progress handling gets exercised. Reads and writes must
//! stay within a single region.

use super::time::{system_file_time, wrap_ticks};
use super::{native_blueprints, require_attached, RegionQuery, TargetBackend};
use crate::blueprint::BlueprintKey;
use crate::core::types::{
    MemoryAddress, MemoryInformation, ModuleBounds, ProcessId, TargetError, TargetResult,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Instant;

struct MockRegion {
    info: MemoryInformation,
    readable: bool,
    bytes: RwLock<Vec<u8>>,
}

/// Memory-backed [`TargetBackend`]
pub struct MockTarget {
    regions: BTreeMap<MemoryAddress, MockRegion>,
    attached_pid: Option<ProcessId>,
    main_module: Option<ModuleBounds>,
    page_size: usize,
    lowest: MemoryAddress,
    highest: MemoryAddress,
    supported: BTreeSet<BlueprintKey>,
    open_handles: AtomicUsize,
    started: Instant,
}

impl MockTarget {
    /// Empty, unattached address space spanning `0x10000..=0x7FFFFFFF`
    pub fn new() -> Self {
        MockTarget {
            regions: BTreeMap::new(),
            attached_pid: None,
            main_module: None,
            page_size: 0x1000,
            lowest: MemoryAddress::new(0x10000),
            highest: MemoryAddress::new(0x7FFF_FFFF),
            supported: native_blueprints(),
            open_handles: AtomicUsize::new(0),
            started: Instant::now(),
        }
    }

    /// Attached target with a single committed, writeable region
    pub fn attached_with_page(base: usize, size: usize) -> Self {
        let mut target = Self::new().with_address_range(
            MemoryAddress::new(base.min(0x10000)),
            MemoryAddress::new(0x7FFF_FFFF),
        );
        target.map_region(MemoryAddress::new(base), size, true, true, true, false);
        target.attached_pid = Some(1);
        target.open_handles.store(1, Ordering::SeqCst);
        target
    }

    /// Overrides the addressable range reported to walkers
    pub fn with_address_range(mut self, lowest: MemoryAddress, highest: MemoryAddress) -> Self {
        self.lowest = lowest;
        self.highest = highest;
        self
    }

    /// Overrides the page size
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Declares the range `attach` reports as the main module
    pub fn with_main_module(mut self, bounds: ModuleBounds) -> Self {
        self.main_module = Some(bounds);
        self
    }

    /// Adds a zero-filled region
    pub fn map_region(
        &mut self,
        base: MemoryAddress,
        size: usize,
        committed: bool,
        readable: bool,
        writeable: bool,
        executable: bool,
    ) {
        let info = MemoryInformation::new(base, size, committed, executable, writeable);
        self.regions.insert(
            base,
            MockRegion {
                info,
                readable: readable && committed,
                bytes: RwLock::new(vec![0u8; size]),
            },
        );
    }

    /// Writes bytes directly, ignoring protection
    pub fn poke(&mut self, address: MemoryAddress, data: &[u8]) {
        if let Some((region, offset)) = self.locate(address, data.len()) {
            if let Ok(mut bytes) = region.bytes.write() {
                bytes[offset..offset + data.len()].copy_from_slice(data);
            }
        }
    }

    /// Region containing `address`, regardless of attach state
    pub fn region_at(&self, address: MemoryAddress) -> Option<MemoryInformation> {
        self.containing(address).map(|region| region.info)
    }

    /// Number of simulated OS handles currently held
    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }

    pub fn attached_pid(&self) -> Option<ProcessId> {
        self.attached_pid
    }

    fn containing(&self, address: MemoryAddress) -> Option<&MockRegion> {
        self.regions
            .range(..=address)
            .next_back()
            .map(|(_, region)| region)
            .filter(|region| region.info.contains(address))
    }

    fn locate(&self, address: MemoryAddress, len: usize) -> Option<(&MockRegion, usize)> {
        let region = self.containing(address)?;
        let offset = address.offset_from(region.info.allocation_base)?;
        let end = offset.checked_add(len)?;
        (end <= region.info.allocation_size).then_some((region, offset))
    }
}

impl Default for MockTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetBackend for MockTarget {
    fn attach(&mut self, pid: ProcessId) -> TargetResult<()> {
        self.detach();
        if pid == 0 {
            return Err(TargetError::ProcessNotFound(pid));
        }
        self.open_handles.fetch_add(1, Ordering::SeqCst);
        self.attached_pid = Some(pid);
        Ok(())
    }

    fn detach(&mut self) {
        if self.attached_pid.take().is_some() {
            self.open_handles.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn is_attached(&self) -> bool {
        self.attached_pid.is_some()
    }

    fn query_memory(&self, address: MemoryAddress) -> RegionQuery {
        if require_attached(self.is_attached()).is_err() {
            return RegionQuery::gap_after(address, self.page_size);
        }
        match self.containing(address) {
            Some(region) => RegionQuery::Region(region.info),
            None => RegionQuery::gap_after(address, self.page_size),
        }
    }

    fn main_module_bounds(&self) -> Option<ModuleBounds> {
        self.attached_pid.and(self.main_module)
    }

    fn raw_read(&self, address: MemoryAddress, buffer: &mut [u8]) -> TargetResult<()> {
        require_attached(self.is_attached())?;
        let (region, offset) = self
            .locate(address, buffer.len())
            .filter(|(region, _)| region.readable)
            .ok_or_else(|| TargetError::read_failed(address, buffer.len()))?;
        let bytes = region
            .bytes
            .read()
            .map_err(|_| TargetError::read_failed(address, buffer.len()))?;
        buffer.copy_from_slice(&bytes[offset..offset + buffer.len()]);
        Ok(())
    }

    fn raw_write(&self, address: MemoryAddress, data: &[u8]) -> TargetResult<()> {
        require_attached(self.is_attached())?;
        let (region, offset) = self
            .locate(address, data.len())
            .filter(|(region, _)| region.readable && region.info.is_writeable)
            .ok_or_else(|| TargetError::write_failed(address, data.len()))?;
        let mut bytes = region
            .bytes
            .write()
            .map_err(|_| TargetError::write_failed(address, data.len()))?;
        bytes[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn file_time_64(&self) -> u64 {
        system_file_time()
    }

    fn tick_time_32(&self) -> u32 {
        wrap_ticks(self.started.elapsed().as_millis())
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    fn lowest_address(&self) -> MemoryAddress {
        self.lowest
    }

    fn highest_address(&self) -> MemoryAddress {
        self.highest
    }

    fn supported_blueprints(&self) -> &BTreeSet<BlueprintKey> {
        &self.supported
    }

    fn pointer_size(&self) -> usize {
        std::mem::size_of::<usize>()
    }

    fn is_little_endian(&self) -> bool {
        cfg!(target_endian = "little")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guarded() -> MockTarget {
        let mut target = MockTarget::new();
        target.map_region(MemoryAddress::new(0x20000), 0x1000, true, true, true, false);
        target.map_region(MemoryAddress::new(0x21000), 0x1000, true, false, false, false);
        target.map_region(MemoryAddress::new(0x22000), 0x1000, true, true, false, false);
        target.attach(7).unwrap();
        target
    }

    #[test]
    fn test_attach_and_reattach_release_handles() {
        let mut target = MockTarget::new();
        assert!(!target.is_attached());

        target.attach(10).unwrap();
        assert!(target.is_attached());
        assert_eq!(target.open_handles(), 1);

        target.attach(11).unwrap();
        assert_eq!(target.attached_pid(), Some(11));
        assert_eq!(target.open_handles(), 1);

        target.detach();
        target.detach();
        assert_eq!(target.open_handles(), 0);
    }

    #[test]
    fn test_failed_attach_leaves_unattached() {
        let mut target = MockTarget::new();
        target.attach(10).unwrap();
        assert!(target.attach(0).is_err());
        assert!(!target.is_attached());
        assert_eq!(target.open_handles(), 0);
    }

    #[test]
    fn test_query_reports_region_and_gap() {
        let target = guarded();
        let query = target.query_memory(MemoryAddress::new(0x20010));
        assert_eq!(query.next_address(), MemoryAddress::new(0x21000));

        let gap = target.query_memory(MemoryAddress::new(0x30000));
        assert!(gap.is_gap());
        assert_eq!(gap.next_address(), MemoryAddress::new(0x31000));
    }

    #[test]
    fn test_read_write_round_trip() {
        let target = guarded();
        let address = MemoryAddress::new(0x20100);

        let original = target.read_bytes(address, 4).unwrap();
        target.raw_write(address, &[1, 2, 3, 4]).unwrap();
        assert_eq!(target.read_bytes(address, 4).unwrap(), vec![1, 2, 3, 4]);

        target.raw_write(address, &original).unwrap();
        assert_eq!(target.read_bytes(address, 4).unwrap(), original);
    }

    #[test]
    fn test_protection_is_enforced() {
        let target = guarded();
        let mut buffer = [0u8; 4];
        assert!(target
            .raw_read(MemoryAddress::new(0x21000), &mut buffer)
            .is_err());
        assert!(target
            .raw_write(MemoryAddress::new(0x22000), &buffer)
            .is_err());
        // Straddling two regions
        assert!(target
            .raw_read(MemoryAddress::new(0x20FFE), &mut buffer)
            .is_err());
    }

    #[test]
    fn test_main_module_only_while_attached() {
        let bounds = ModuleBounds::new(MemoryAddress::new(0x20000), 0x3000);
        let mut target = MockTarget::new().with_main_module(bounds);
        assert!(target.main_module_bounds().is_none());
        target.attach(3).unwrap();
        assert_eq!(target.main_module_bounds(), Some(bounds));
    }

    #[test]
    fn test_read_pointer() {
        let mut target = MockTarget::attached_with_page(0x40000, 0x1000);
        let value = 0x1234_5678usize;
        target.poke(MemoryAddress::new(0x40010), &value.to_ne_bytes());
        assert_eq!(
            target.read_pointer(MemoryAddress::new(0x40010)).unwrap(),
            MemoryAddress::new(value)
        );
    }
}
