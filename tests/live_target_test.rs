//! Platform backend attached to the test process itself

#![cfg(any(target_os = "linux", windows))]

use xenoscan::config::WalkConfig;
use xenoscan::target::PlatformTarget;
use xenoscan::{MemoryAddress, RegionQuery, RegionWalker, TargetBackend, TargetError};

fn current_pid() -> u32 {
    std::process::id()
}

fn attached() -> PlatformTarget {
    let mut target = PlatformTarget::new();
    target.attach(current_pid()).unwrap();
    target
}

/// Three pages with the middle one inaccessible
struct GuardedPages {
    base: usize,
    page: usize,
}

impl GuardedPages {
    #[cfg(target_os = "linux")]
    fn new(page: usize) -> Self {
        unsafe {
            let base = libc::mmap(
                std::ptr::null_mut(),
                page * 3,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            );
            assert_ne!(base, libc::MAP_FAILED);
            let guard = (base as usize + page) as *mut libc::c_void;
            assert_eq!(libc::mprotect(guard, page, libc::PROT_NONE), 0);
            GuardedPages {
                base: base as usize,
                page,
            }
        }
    }

    #[cfg(windows)]
    fn new(page: usize) -> Self {
        use winapi::um::memoryapi::{VirtualAlloc, VirtualProtect};
        use winapi::um::winnt::{MEM_COMMIT, MEM_RESERVE, PAGE_NOACCESS, PAGE_READWRITE};

        unsafe {
            let base = VirtualAlloc(
                std::ptr::null_mut(),
                page * 3,
                MEM_COMMIT | MEM_RESERVE,
                PAGE_READWRITE,
            );
            assert!(!base.is_null());
            let mut old = 0;
            let guard = (base as usize + page) as *mut _;
            assert_ne!(VirtualProtect(guard, page, PAGE_NOACCESS, &mut old), 0);
            GuardedPages {
                base: base as usize,
                page,
            }
        }
    }

    fn guard(&self) -> MemoryAddress {
        MemoryAddress::new(self.base + self.page)
    }

    fn end(&self) -> MemoryAddress {
        MemoryAddress::new(self.base + self.page * 3)
    }
}

impl Drop for GuardedPages {
    fn drop(&mut self) {
        #[cfg(target_os = "linux")]
        unsafe {
            libc::munmap(self.base as *mut libc::c_void, self.page * 3);
        }
        #[cfg(windows)]
        unsafe {
            winapi::um::memoryapi::VirtualFree(
                self.base as *mut _,
                0,
                winapi::um::winnt::MEM_RELEASE,
            );
        }
    }
}

#[test]
#[cfg_attr(miri, ignore = "FFI not supported in Miri")]
fn test_main_module_contains_code() {
    let target = attached();
    let bounds = target.main_module_bounds().unwrap();
    assert!(bounds.contains(MemoryAddress::new(test_main_module_contains_code as fn() as usize)));
    assert!(bounds.start >= target.lowest_address());
    assert!(bounds.end <= target.highest_address().saturating_add(1));
}

#[test]
#[cfg_attr(miri, ignore = "FFI not supported in Miri")]
fn test_read_and_write_own_memory() {
    let target = attached();
    let mut buffer = *b"xenoscan-live-buf";
    let address = MemoryAddress::from(buffer.as_mut_ptr());

    assert_eq!(target.read_bytes(address, buffer.len()).unwrap(), b"xenoscan-live-buf");

    target.raw_write(address, b"XENO").unwrap();
    assert_eq!(&target.read_bytes(address, 4).unwrap(), b"XENO");
    assert_eq!(unsafe { std::ptr::read_volatile(&buffer[0]) }, b'X');
}

#[test]
#[cfg_attr(miri, ignore = "FFI not supported in Miri")]
fn test_region_query_covers_stack_value() {
    let target = attached();
    let value = 0u64;
    let address = MemoryAddress::from(&value as *const u64);

    match target.query_memory(address) {
        RegionQuery::Region(region) => {
            assert!(region.contains(address));
            assert!(region.is_committed);
            assert!(region.is_writeable);
        }
        RegionQuery::Gap { .. } => panic!("stack address reported as a gap"),
    }
}

#[test]
#[cfg_attr(miri, ignore = "FFI not supported in Miri")]
fn test_guard_page_unreadable_and_walk_terminates() {
    let target = attached();
    let pages = GuardedPages::new(target.page_size());

    let config = WalkConfig {
        start_address: Some(MemoryAddress::new(pages.base)),
        end_address: Some(pages.end().saturating_add(target.page_size())),
        gap_stride_pages: 1,
        committed_only: false,
        max_regions: 0,
    };
    let regions: Vec<_> = RegionWalker::with_config(&target, &config).collect();
    assert!(!regions.is_empty());

    let committed_at = |address: MemoryAddress| {
        regions
            .iter()
            .any(|region| region.is_committed && region.contains(address))
    };
    assert!(committed_at(MemoryAddress::new(pages.base)));
    assert!(committed_at(MemoryAddress::new(pages.base + 2 * pages.page)));

    let readable = MemoryAddress::new(pages.base);
    assert!(target.read_bytes(readable, 8).is_ok());
    assert!(target.read_bytes(pages.guard(), 8).is_err());

    let straddling = pages.guard().saturating_add(pages.page - 4);
    assert!(target.read_bytes(straddling, 8).is_err());

    #[cfg(target_os = "linux")]
    for region in regions.iter().filter(|region| region.is_committed) {
        assert!(!region.contains(pages.guard()));
    }
}

#[test]
#[cfg_attr(miri, ignore = "FFI not supported in Miri")]
fn test_unmapped_read_fails() {
    let target = attached();
    let result = target.read_bytes(target.lowest_address(), 8);
    assert!(matches!(
        result,
        Err(TargetError::ReadFailed { .. }) | Err(TargetError::PartialTransfer { .. })
    ));
}

#[test]
#[cfg_attr(miri, ignore = "FFI not supported in Miri")]
fn test_timing_sources() {
    let target = attached();
    // 2020-01-01T00:00:00Z in FILETIME ticks
    assert!(target.file_time_64() > 132_223_104_000_000_000);

    let before = target.tick_time_32();
    std::thread::sleep(std::time::Duration::from_millis(20));
    let after = target.tick_time_32();
    assert!(after.wrapping_sub(before) >= 10);
}

#[test]
#[cfg_attr(miri, ignore = "FFI not supported in Miri")]
fn test_reattach_replaces_module_bounds() {
    let mut target = attached();
    let first = target.main_module_bounds();
    target.attach(current_pid()).unwrap();
    assert_eq!(target.main_module_bounds(), first);

    target.detach();
    assert!(!target.is_attached());
    assert!(target.main_module_bounds().is_none());
}
