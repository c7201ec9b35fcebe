//! Configuration module
//!
//! Handles driver settings: protocol selection, connection parameters,
//! polling behaviour and the sensor map.

mod settings;

pub use settings::{ConfigError, DriverConfig, Protocol, SensorMap};

use directories::ProjectDirs;
use std::path::PathBuf;

/// Get the application configuration directory
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "wxt5x0", "WXT5x0").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the default configuration file path
pub fn config_file() -> Option<PathBuf> {
    config_dir().map(|d| d.join("wxt5x0.toml"))
}
