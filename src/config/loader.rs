//! Configuration loader
//!
//! Loads TOML configuration and fills every missing field from the defaults.

use super::defaults::default_config;
use crate::core::types::MemoryAddress;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_walk")]
    pub walk: WalkConfig,

    #[serde(default = "default_scan")]
    pub scan: ScanConfig,

    #[serde(default = "default_probe")]
    pub probe: ProbeConfig,

    #[serde(default = "default_logging")]
    pub logging: LoggingConfig,
}

/// Address-space walk configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkConfig {
    /// First address to query; the backend's lowest address when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_address: Option<MemoryAddress>,
    /// Last address to query; the backend's highest address when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_address: Option<MemoryAddress>,
    /// Minimum pages skipped after a failed query
    #[serde(default = "default_gap_stride_pages")]
    pub gap_stride_pages: usize,
    #[serde(default = "default_committed_only")]
    pub committed_only: bool,
    /// 0 means unlimited
    #[serde(default = "default_max_regions")]
    pub max_regions: usize,
}

/// Region scanning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_max_read_size")]
    pub max_read_size: usize,
}

/// Probe binary configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Re-walk interval; 0 walks once
    #[serde(default = "default_watch_interval_secs")]
    pub watch_interval_secs: u64,
    #[serde(default = "default_header_dump_bytes")]
    pub header_dump_bytes: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Configuration loader
pub struct ConfigLoader {
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Creates a new configuration loader
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        ConfigLoader {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    /// Loads configuration from file
    pub fn load(&self) -> Result<Config, ConfigError> {
        if !self.config_path.exists() {
            return Err(ConfigError::FileNotFound(
                self.config_path.display().to_string(),
            ));
        }

        let contents = fs::read_to_string(&self.config_path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Loads configuration, falling back to defaults only when the file is absent
    pub fn load_or_default(&self) -> Result<Config, ConfigError> {
        match self.load() {
            Err(ConfigError::FileNotFound(_)) => Ok(Config::default()),
            other => other,
        }
    }

    /// Saves configuration to file
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, contents)?;
        Ok(())
    }
}

/// Loads `xenoscan.toml` from the working directory, or defaults
pub fn load_config() -> Result<Config, ConfigError> {
    ConfigLoader::new("xenoscan.toml").load_or_default()
}

fn default_walk() -> WalkConfig {
    WalkConfig {
        start_address: None,
        end_address: None,
        gap_stride_pages: default_gap_stride_pages(),
        committed_only: default_committed_only(),
        max_regions: default_max_regions(),
    }
}

fn default_scan() -> ScanConfig {
    let defaults = default_config();
    ScanConfig {
        worker_threads: defaults.scan.worker_threads,
        chunk_size: defaults.scan.chunk_size,
        max_read_size: defaults.scan.max_read_size,
    }
}

fn default_probe() -> ProbeConfig {
    let defaults = default_config();
    ProbeConfig {
        watch_interval_secs: defaults.probe.watch_interval_secs,
        header_dump_bytes: defaults.probe.header_dump_bytes,
    }
}

fn default_logging() -> LoggingConfig {
    LoggingConfig {
        level: default_log_level(),
    }
}

fn default_gap_stride_pages() -> usize {
    default_config().walk.gap_stride_pages
}

fn default_committed_only() -> bool {
    default_config().walk.committed_only
}

fn default_max_regions() -> usize {
    default_config().walk.max_regions
}

fn default_worker_threads() -> usize {
    default_config().scan.worker_threads
}

fn default_chunk_size() -> usize {
    default_config().scan.chunk_size
}

fn default_max_read_size() -> usize {
    default_config().scan.max_read_size
}

fn default_watch_interval_secs() -> u64 {
    default_config().probe.watch_interval_secs
}

fn default_header_dump_bytes() -> usize {
    default_config().probe.header_dump_bytes
}

fn default_log_level() -> String {
    default_config().logging.level
}

impl Default for Config {
    fn default() -> Self {
        Config {
            walk: default_walk(),
            scan: default_scan(),
            probe: default_probe(),
            logging: default_logging(),
        }
    }
}

impl Default for WalkConfig {
    fn default() -> Self {
        default_walk()
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        default_scan()
    }
}
