//! CLI runner for common setup and operations.
//!
//! Encapsulates config loading and logging initialization so command
//! handlers start from a ready environment.

use std::path::Path;

use crate::error::CliError;
use tilepyramid::config::ConfigFile;
use tilepyramid::logging::{init_logging, LoggingGuard, LoggingOptions};
use tracing::info;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    /// Loaded configuration file
    config: ConfigFile,
}

impl CliRunner {
    /// Load config (from `config_path`, or the default location) and start
    /// logging to the configured file.
    ///
    /// # Arguments
    ///
    /// * `config_path` - Explicit config file; `None` uses ~/.tilepyramid/config.ini
    /// * `options` - stdout mirroring and debug level
    pub fn new(config_path: Option<&Path>, options: LoggingOptions) -> Result<Self, CliError> {
        let config = match config_path {
            Some(path) => {
                if !path.exists() {
                    return Err(CliError::Config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                ConfigFile::load_from(path)?
            }
            None => ConfigFile::load()?,
        };

        let logging_guard = init_logging(&config.logging.file, options)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("TilePyramid v{}", tilepyramid::VERSION);
        info!(
            log_file = %self.config.logging.file.display(),
            "TilePyramid CLI: {} command", command
        );
    }
}
