//! Forward-walking region iterator over a target's address space

use crate::config::{ScanConfig, WalkConfig};
use crate::core::types::{MemoryAddress, MemoryInformation, TargetError, TargetResult};
use crate::target::{RegionQuery, TargetBackend};
use rayon::prelude::*;
use tracing::{debug, trace};

/// Iterates regions by repeatedly calling
/// [`query_memory`](TargetBackend::query_memory) and jumping to the returned
/// next address.
///
/// Failed queries advance by at least `gap_stride_pages` pages. The walk ends
/// once the cursor passes the end address or stops moving forward, so it
/// terminates on any backend that honours the one-page progress rule.
pub struct RegionWalker<'a> {
    target: &'a dyn TargetBackend,
    cursor: MemoryAddress,
    end: MemoryAddress,
    gap_stride: usize,
    committed_only: bool,
    limit: Option<usize>,
    yielded: usize,
    gaps: usize,
    finished: bool,
}

impl<'a> RegionWalker<'a> {
    /// Walks every reported region from the lowest to the highest address
    pub fn new(target: &'a dyn TargetBackend) -> Self {
        RegionWalker {
            target,
            cursor: target.lowest_address(),
            end: target.highest_address(),
            gap_stride: target.page_size().max(1),
            committed_only: false,
            limit: None,
            yielded: 0,
            gaps: 0,
            finished: false,
        }
    }

    /// Walk shaped by `config`
    pub fn with_config(target: &'a dyn TargetBackend, config: &WalkConfig) -> Self {
        let mut walker = Self::new(target);
        if let Some(start) = config.start_address {
            walker.cursor = start;
        }
        if let Some(end) = config.end_address {
            walker.end = end;
        }
        walker.gap_stride = target
            .page_size()
            .max(1)
            .saturating_mul(config.gap_stride_pages.max(1));
        walker.committed_only = config.committed_only;
        walker.limit = (config.max_regions > 0).then_some(config.max_regions);
        walker
    }

    /// Only yield committed, non-mirrored regions
    pub fn committed(mut self) -> Self {
        self.committed_only = true;
        self
    }

    /// Failed queries seen so far
    pub fn gaps(&self) -> usize {
        self.gaps
    }

    /// Next address the walk will query
    pub fn cursor(&self) -> MemoryAddress {
        self.cursor
    }

    fn advance(&mut self, query: &RegionQuery) {
        let mut next = query.next_address();
        if query.is_gap() {
            self.gaps += 1;
            next = next.max(self.cursor.saturating_add(self.gap_stride));
            trace!(address = %self.cursor, next = %next, "query gap");
        }

        if next <= self.cursor {
            debug!(address = %self.cursor, "walk stopped advancing");
            self.finished = true;
        } else {
            self.cursor = next;
        }
    }
}

impl<'a> Iterator for RegionWalker<'a> {
    type Item = MemoryInformation;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished && self.cursor <= self.end {
            if self.limit.map_or(false, |limit| self.yielded >= limit) {
                self.finished = true;
                break;
            }

            let query = self.target.query_memory(self.cursor);
            self.advance(&query);

            if let RegionQuery::Region(info) = query {
                if self.committed_only && !info.is_scannable() {
                    continue;
                }
                self.yielded += 1;
                return Some(info);
            }
        }
        None
    }
}

/// Splits a region into consecutive `(address, len)` reads of at most `chunk_size` bytes
pub fn region_chunks(
    region: &MemoryInformation,
    chunk_size: usize,
) -> impl Iterator<Item = (MemoryAddress, usize)> {
    let base = region.allocation_base;
    let size = region.allocation_size;
    let step = chunk_size.max(1);
    (0..size)
        .step_by(step)
        .map(move |offset| (base.wrapping_add(offset), step.min(size - offset)))
}

/// Runs `f` over every region the walk yields, on a pool of
/// `scan.worker_threads` workers sharing `target`.
///
/// The region list is collected first; results come back in address order.
pub fn map_regions_parallel<R, F>(
    target: &dyn TargetBackend,
    walk: &WalkConfig,
    scan: &ScanConfig,
    f: F,
) -> TargetResult<Vec<R>>
where
    R: Send,
    F: Fn(&dyn TargetBackend, &MemoryInformation) -> R + Send + Sync,
{
    let regions: Vec<MemoryInformation> = RegionWalker::with_config(target, walk).collect();
    debug!(
        regions = regions.len(),
        workers = scan.worker_threads,
        "dispatching regions"
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(scan.worker_threads.max(1))
        .build()
        .map_err(|e| TargetError::WorkerPool(e.to_string()))?;

    Ok(pool.install(|| {
        regions
            .par_iter()
            .map(|region| f(target, region))
            .collect()
    }))
}

/// Counts the bytes of `region` that read back successfully, chunk by chunk
pub fn readable_bytes(
    target: &dyn TargetBackend,
    region: &MemoryInformation,
    chunk_size: usize,
) -> usize {
    let mut buffer = vec![0u8; chunk_size.max(1).min(region.allocation_size)];
    region_chunks(region, chunk_size)
        .filter(|(address, len)| target.raw_read(*address, &mut buffer[..*len]).is_ok())
        .map(|(_, len)| len)
        .sum()
}
