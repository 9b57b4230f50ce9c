//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;
use tilepyramid::config::ConfigFileError;
use tilepyramid::extract::ExtractError;
use tilepyramid::pipeline::PipelineError;
use tilepyramid::store::StoreError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Failed to load the feature input
    Input(ExtractError),
    /// Failed to open the tile store
    Store(StoreError),
    /// Failed to start the async runtime
    Runtime(std::io::Error),
    /// Pipeline failed or finished with failed tiles
    Pipeline(PipelineError),
    /// Failed to write output file
    FileWrite { path: String, error: std::io::Error },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Pipeline(PipelineError::LevelFailed { .. })
            | CliError::Pipeline(PipelineError::CompletedWithFailures { .. }) => {
                eprintln!();
                eprintln!("Failed tiles are listed in the log file with their zoom and x/y.");
                eprintln!("Re-running is safe: tiles already stored are skipped.");
            }
            CliError::Store(StoreError::InvalidTableName(_)) => {
                eprintln!();
                eprintln!("Table names may only contain letters, digits and '_'.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Input(e) => write!(f, "Failed to load features: {}", e),
            CliError::Store(e) => write!(f, "Failed to open tile store: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to start runtime: {}", e),
            CliError::Pipeline(e) => write!(f, "Tile generation failed: {}", e),
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write file '{}': {}", path, error)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Input(e) => Some(e),
            CliError::Store(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::Pipeline(e) => Some(e),
            CliError::FileWrite { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<ExtractError> for CliError {
    fn from(e: ExtractError) -> Self {
        CliError::Input(e)
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        CliError::Store(e)
    }
}

impl From<PipelineError> for CliError {
    fn from(e: PipelineError) -> Self {
        if e.is_config_error() {
            CliError::Config(e.to_string())
        } else {
            CliError::Pipeline(e)
        }
    }
}
