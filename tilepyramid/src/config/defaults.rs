//! Default values for all configuration settings and the
//! `ConfigFile::default()` implementation.

use super::settings::*;
use crate::coord::{
    DEFAULT_REFERENCE_ZOOM, DEFAULT_X_MAX, DEFAULT_X_MIN, DEFAULT_Y_MAX, DEFAULT_Y_MIN,
};
use crate::pipeline::{DEFAULT_MAX_CONCURRENCY, DEFAULT_ZOOM_MAX, DEFAULT_ZOOM_MIN};

pub use crate::store::DEFAULT_TABLE;

/// Default database file name inside the config directory.
pub const DEFAULT_DATABASE_FILE: &str = "tiles.sqlite";

/// Default log file name inside the config directory.
pub const DEFAULT_LOG_FILE: &str = "tilepyramid.log";

pub const DEFAULT_ABORT_ON_LEVEL_ERROR: bool = true;

impl Default for ConfigFile {
    fn default() -> Self {
        let config_dir = super::file::config_directory();

        Self {
            pipeline: PipelineSettings {
                zoom_min: DEFAULT_ZOOM_MIN,
                zoom_max: DEFAULT_ZOOM_MAX,
                max_concurrency: DEFAULT_MAX_CONCURRENCY,
                abort_on_level_error: DEFAULT_ABORT_ON_LEVEL_ERROR,
            },
            window: WindowSettings {
                reference_zoom: DEFAULT_REFERENCE_ZOOM,
                x_min: DEFAULT_X_MIN,
                x_max: DEFAULT_X_MAX,
                y_min: DEFAULT_Y_MIN,
                y_max: DEFAULT_Y_MAX,
            },
            storage: StorageSettings {
                database: config_dir.join(DEFAULT_DATABASE_FILE),
                table: DEFAULT_TABLE.to_string(),
            },
            logging: LoggingSettings {
                file: config_dir.join(DEFAULT_LOG_FILE),
            },
        }
    }
}
