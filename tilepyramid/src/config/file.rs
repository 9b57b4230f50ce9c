//! Configuration file handling for ~/.tilepyramid/config.ini.
//!
//! Loads and saves user configuration with sensible defaults.
//! Settings structs live in [`super::settings`], constants in [`super::defaults`],
//! parsing in [`super::parser`], and serialization in [`super::writer`].

use ini::Ini;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::settings::ConfigFile;
use crate::coord::{BoundingWindow, WindowError};
use crate::pipeline::PipelineConfig;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

impl ConfigFile {
    /// Load configuration from the default path (~/.tilepyramid/config.ini).
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load() -> Result<Self, ConfigFileError> {
        let path = config_file_path();
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Save configuration to the default path (~/.tilepyramid/config.ini).
    pub fn save(&self) -> Result<(), ConfigFileError> {
        let path = config_file_path();
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        let content = super::writer::to_config_string(self);
        std::fs::write(path, content).map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Create the default config file if it doesn't exist.
    ///
    /// Returns the path to the config file.
    pub fn ensure_exists() -> Result<PathBuf, ConfigFileError> {
        let path = config_file_path();
        if !path.exists() {
            let config = Self::default();
            config.save_to(&path)?;
        }
        Ok(path)
    }

    /// Builds the bounding window from the `[window]` section.
    pub fn bounding_window(&self) -> Result<BoundingWindow, ConfigFileError> {
        let w = &self.window;
        BoundingWindow::new(w.reference_zoom, w.x_min, w.x_max, w.y_min, w.y_max)
            .map_err(|e| window_error(&e, w))
    }

    /// Builds the orchestrator settings from `[pipeline]` and `[window]`.
    pub fn pipeline_config(&self) -> Result<PipelineConfig, ConfigFileError> {
        let p = &self.pipeline;
        let config = PipelineConfig {
            zoom_min: p.zoom_min,
            zoom_max: p.zoom_max,
            max_concurrency: p.max_concurrency,
            window: self.bounding_window()?,
            abort_on_level_error: p.abort_on_level_error,
        };

        config
            .validate()
            .map_err(|e| ConfigFileError::InvalidValue {
                section: "pipeline".to_string(),
                key: pipeline_key(&e).to_string(),
                value: pipeline_value(&e, p),
                reason: e.to_string(),
            })?;

        Ok(config)
    }
}

fn pipeline_key(err: &crate::pipeline::PipelineError) -> &'static str {
    use crate::pipeline::PipelineError;
    match err {
        PipelineError::ZeroConcurrency => "max_concurrency",
        PipelineError::InvalidZoomRange { .. } => "zoom_min",
        _ => "zoom_max",
    }
}

fn pipeline_value(
    err: &crate::pipeline::PipelineError,
    p: &super::settings::PipelineSettings,
) -> String {
    match pipeline_key(err) {
        "max_concurrency" => p.max_concurrency.to_string(),
        "zoom_min" => p.zoom_min.to_string(),
        _ => p.zoom_max.to_string(),
    }
}

/// Maps a window construction error to the offending `[window]` key.
pub(super) fn window_error(err: &WindowError, w: &super::settings::WindowSettings) -> ConfigFileError {
    let (key, value) = match err {
        WindowError::InvalidReferenceZoom(z) => ("reference_zoom", z.to_string()),
        WindowError::EmptyRange { axis: 'x', .. } | WindowError::OutOfGrid { axis: 'x', .. } => {
            ("x_max", w.x_max.to_string())
        }
        WindowError::EmptyRange { .. } | WindowError::OutOfGrid { .. } => {
            ("y_max", w.y_max.to_string())
        }
    };

    ConfigFileError::InvalidValue {
        section: "window".to_string(),
        key: key.to_string(),
        value,
        reason: err.to_string(),
    }
}

/// Get the path to the config directory (~/.tilepyramid).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tilepyramid")
}

/// Get the path to the config file (~/.tilepyramid/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::*;

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default();

        assert_eq!(config.pipeline.zoom_min, 0);
        assert_eq!(config.pipeline.zoom_max, 14);
        assert_eq!(config.pipeline.max_concurrency, 50);
        assert!(config.pipeline.abort_on_level_error);
        assert_eq!(config.window.reference_zoom, 13);
        assert_eq!(config.window.x_min, 3900);
        assert_eq!(config.window.x_max, 4400);
        assert_eq!(config.window.y_min, 2700);
        assert_eq!(config.window.y_max, 3100);
        assert_eq!(config.storage.table, DEFAULT_TABLE);
        assert!(config.storage.database.ends_with(DEFAULT_DATABASE_FILE));
        assert!(config.logging.file.ends_with(DEFAULT_LOG_FILE));
    }

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.ini");

        let config = ConfigFile::load_from(&config_path).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_default_pipeline_config() {
        let config = ConfigFile::default().pipeline_config().unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_pipeline_config_reports_offending_key() {
        let mut config = ConfigFile::default();
        config.pipeline.max_concurrency = 0;

        match config.pipeline_config() {
            Err(ConfigFileError::InvalidValue {
                section, key, value, ..
            }) => {
                assert_eq!(section, "pipeline");
                assert_eq!(key, "max_concurrency");
                assert_eq!(value, "0");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_bounding_window_reports_offending_key() {
        let mut config = ConfigFile::default();
        config.window.y_max = config.window.y_min;

        match config.bounding_window() {
            Err(ConfigFileError::InvalidValue { section, key, .. }) => {
                assert_eq!(section, "window");
                assert_eq!(key, "y_max");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.ini");

        ConfigFile::default().save_to(&path).unwrap();
        assert!(path.exists());
    }
}
