//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Zoom range and concurrency
    pub pipeline: PipelineSettings,
    /// Bounding window at the reference zoom
    pub window: WindowSettings,
    /// Tile database location
    pub storage: StorageSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Lowest zoom level generated
    pub zoom_min: u8,
    /// Highest zoom level generated (inclusive)
    pub zoom_max: u8,
    /// Maximum tiles processed concurrently
    pub max_concurrency: usize,
    /// Stop the run after the first level with failed tiles
    pub abort_on_level_error: bool,
}

/// Bounding window configuration.
///
/// `min` bounds are inclusive, `max` bounds exclusive, both expressed at
/// `reference_zoom`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSettings {
    pub reference_zoom: u8,
    pub x_min: u32,
    pub x_max: u32,
    pub y_min: u32,
    pub y_max: u32,
}

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    /// SQLite database file
    pub database: PathBuf,
    /// Destination table
    pub table: String,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}
