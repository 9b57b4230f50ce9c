//! Configuration file for the tile pyramid generator.
//!
//! Settings are read from `~/.tilepyramid/config.ini`. A missing file means
//! defaults; command-line flags override individual values afterwards.
//!
//! # Example
//!
//! ```ignore
//! use tilepyramid::config::ConfigFile;
//!
//! let config = ConfigFile::load()?;
//! let pipeline = config.pipeline_config()?;
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::{
    DEFAULT_ABORT_ON_LEVEL_ERROR, DEFAULT_DATABASE_FILE, DEFAULT_LOG_FILE, DEFAULT_TABLE,
};
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{ConfigFile, LoggingSettings, PipelineSettings, StorageSettings, WindowSettings};
