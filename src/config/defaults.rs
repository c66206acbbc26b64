//! Default configuration values

use serde::{Deserialize, Serialize};

/// Default configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDefaults {
    pub walk: WalkDefaults,
    pub scan: ScanDefaults,
    pub probe: ProbeDefaults,
    pub logging: LoggingDefaults,
}

/// Default address-space walk settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkDefaults {
    pub gap_stride_pages: usize,
    pub committed_only: bool,
    pub max_regions: usize,
}

/// Default scan settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanDefaults {
    pub worker_threads: usize,
    pub chunk_size: usize,
    pub max_read_size: usize,
}

/// Default probe binary settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeDefaults {
    pub watch_interval_secs: u64,
    pub header_dump_bytes: usize,
}

/// Default logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingDefaults {
    pub level: String,
}

/// Returns the default configuration
pub fn default_config() -> ConfigDefaults {
    ConfigDefaults {
        walk: WalkDefaults {
            gap_stride_pages: 1,
            committed_only: true,
            max_regions: 0, // unlimited
        },
        scan: ScanDefaults {
            worker_threads: num_cpus::get().min(8),
            chunk_size: 65536,       // 64KB
            max_read_size: 16777216, // 16MB
        },
        probe: ProbeDefaults {
            watch_interval_secs: 0,
            header_dump_bytes: 16,
        },
        logging: LoggingDefaults {
            level: "info".to_string(),
        },
    }
}
