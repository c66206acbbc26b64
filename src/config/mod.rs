//! Configuration module
//!
//! Provides configuration loading, validation, and default settings for
//! address-space walks, region scanning and the probe binary.

mod defaults;
mod loader;
mod validator;

pub use defaults::{default_config, ConfigDefaults};
pub use loader::{load_config, ConfigLoader};
pub use validator::{validate_config, ConfigValidator};

pub use loader::{Config, LoggingConfig, ProbeConfig, ScanConfig, WalkConfig};

pub use loader::ConfigError;

pub type ConfigResult<T> = Result<T, ConfigError>;
