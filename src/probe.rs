//! Address-space summary produced by the `xenoscan-probe` binary
//!
//! Kept in the library so the report can be built against any
//! [`TargetBackend`], including the in-memory mock.

use crate::blueprint::{compatible_keys, BlueprintRegistry};
use crate::config::Config;
use crate::core::types::{MemoryAddress, MemoryInformation, ModuleBounds, TargetResult};
use crate::memory::{map_regions_parallel, readable_bytes, MemoryMap};
use crate::target::TargetBackend;
use serde::Serialize;
use std::fmt::Write as _;

/// One walked region and how much of it read back
#[derive(Debug, Clone, Serialize)]
pub struct RegionSummary {
    pub base: MemoryAddress,
    pub size: usize,
    pub committed: bool,
    pub executable: bool,
    pub writeable: bool,
    pub readable_bytes: usize,
}

/// Result of one walk over an attached target
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub file_time: u64,
    pub tick_time: u32,
    pub page_size: usize,
    pub lowest_address: MemoryAddress,
    pub highest_address: MemoryAddress,
    pub main_module: Option<ModuleBounds>,
    /// Hex of the first bytes of the main module
    pub module_header: Option<String>,
    /// Keys the backend can be scanned for
    pub supported_blueprints: Vec<String>,
    /// Registered blueprints among those
    pub compatible_blueprints: Vec<String>,
    pub regions: Vec<RegionSummary>,
    pub committed_bytes: usize,
    pub readable_bytes: usize,
}

impl ProbeReport {
    /// Walks `target` with the configured walk and scan settings
    pub fn collect(
        target: &dyn TargetBackend,
        registry: &BlueprintRegistry,
        config: &Config,
    ) -> TargetResult<Self> {
        let chunk_size = config.scan.chunk_size;
        let max_read = config.scan.max_read_size;

        let regions = map_regions_parallel(target, &config.walk, &config.scan, |target, region| {
            let sampled = MemoryInformation::new(
                region.allocation_base,
                region.allocation_size.min(max_read),
                region.is_committed,
                region.is_executable,
                region.is_writeable,
            );
            RegionSummary {
                base: region.allocation_base,
                size: region.allocation_size,
                committed: region.is_committed,
                executable: region.is_executable,
                writeable: region.is_writeable,
                readable_bytes: readable_bytes(target, &sampled, chunk_size),
            }
        })?;

        let main_module = target.main_module_bounds();
        let header_len = config.probe.header_dump_bytes;
        let module_header = main_module
            .filter(|_| header_len > 0)
            .and_then(|bounds| {
                target
                    .read_bytes(bounds.start, header_len.min(bounds.size()))
                    .ok()
            })
            .map(hex::encode);

        Ok(ProbeReport {
            file_time: target.file_time_64(),
            tick_time: target.tick_time_32(),
            page_size: target.page_size(),
            lowest_address: target.lowest_address(),
            highest_address: target.highest_address(),
            main_module,
            module_header,
            supported_blueprints: target
                .supported_blueprints()
                .iter()
                .map(|key| key.as_str().to_string())
                .collect(),
            compatible_blueprints: compatible_keys(registry, target)
                .iter()
                .map(|key| key.as_str().to_string())
                .collect(),
            committed_bytes: regions
                .iter()
                .filter(|r| r.committed)
                .map(|r| r.size)
                .sum(),
            readable_bytes: regions.iter().map(|r| r.readable_bytes).sum(),
            regions,
        })
    }

    /// Identity map of the walked regions
    pub fn memory_map(&self) -> MemoryMap {
        MemoryMap::from_regions(self.regions.iter().map(|region| {
            MemoryInformation::new(
                region.base,
                region.size,
                region.committed,
                region.executable,
                region.writeable,
            )
        }))
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "address space {}..={} (page 0x{:X})",
            self.lowest_address, self.highest_address, self.page_size
        );
        match &self.main_module {
            Some(bounds) => {
                let _ = writeln!(
                    out,
                    "main module   {}..{} ({} bytes)",
                    bounds.start,
                    bounds.end,
                    bounds.size()
                );
            }
            None => {
                let _ = writeln!(out, "main module   <unknown>");
            }
        }
        if let Some(header) = &self.module_header {
            let _ = writeln!(out, "header        {}", header);
        }
        let _ = writeln!(
            out,
            "blueprints    {} (registered: {})",
            self.supported_blueprints.join(", "),
            self.compatible_blueprints.join(", ")
        );
        let _ = writeln!(
            out,
            "regions       {} ({} bytes, {} readable)",
            self.regions.len(),
            self.committed_bytes,
            self.readable_bytes
        );
        for region in &self.regions {
            let _ = writeln!(
                out,
                "  {} {:>12} {}{} {:>12}",
                region.base,
                region.size,
                if region.writeable { 'w' } else { '-' },
                if region.executable { 'x' } else { '-' },
                region.readable_bytes
            );
        }
        out
    }
}
