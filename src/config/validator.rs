//! Configuration validator
//!
//! Validates configuration values to ensure they are within acceptable ranges.

use super::loader::{Config, ConfigError, LoggingConfig, ScanConfig, WalkConfig};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates the entire configuration
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        Self::validate_walk(&config.walk)?;
        Self::validate_scan(&config.scan)?;
        Self::validate_logging(&config.logging)?;
        Ok(())
    }

    fn validate_walk(walk: &WalkConfig) -> Result<(), ConfigError> {
        if walk.gap_stride_pages == 0 {
            return Err(ConfigError::Invalid(
                "Gap stride must be at least 1 page".to_string(),
            ));
        }

        if let (Some(start), Some(end)) = (walk.start_address, walk.end_address) {
            if start >= end {
                return Err(ConfigError::Invalid(format!(
                    "Walk start address {} must be below end address {}",
                    start, end
                )));
            }
        }

        Ok(())
    }

    fn validate_scan(scan: &ScanConfig) -> Result<(), ConfigError> {
        if scan.worker_threads == 0 {
            return Err(ConfigError::Invalid(
                "Scanner threads must be at least 1".to_string(),
            ));
        }

        if scan.worker_threads > 128 {
            return Err(ConfigError::Invalid(
                "Scanner threads cannot exceed 128".to_string(),
            ));
        }

        if scan.chunk_size == 0 || !scan.chunk_size.is_power_of_two() {
            return Err(ConfigError::Invalid(
                "Chunk size must be a power of 2".to_string(),
            ));
        }

        if scan.max_read_size < scan.chunk_size {
            return Err(ConfigError::Invalid(
                "Maximum read size must be at least as large as chunk size".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level: {}. Must be one of: {:?}",
                logging.level, valid_levels
            )));
        }

        Ok(())
    }
}

/// Validates a configuration
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    ConfigValidator::validate(config)
}
