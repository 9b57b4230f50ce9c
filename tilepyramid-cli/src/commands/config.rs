//! Configuration management CLI commands.
//!
//! Provides `config path`, `config show` and `config init` for inspecting
//! and creating the configuration file.

use std::path::Path;

use clap::Subcommand;
use tilepyramid::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Show the effective settings (file values over defaults)
    Show,

    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => run_path(),
        ConfigCommands::Show => run_show(),
        ConfigCommands::Init { force } => run_init(&config_file_path(), force),
    }
}

fn run_path() -> Result<(), CliError> {
    println!("{}", config_file_path().display());
    Ok(())
}

fn run_show() -> Result<(), CliError> {
    let path = config_file_path();
    let config = ConfigFile::load_from(&path)?;

    if path.exists() {
        println!("# {}", path.display());
    } else {
        println!("# {} (not found, showing defaults)", path.display());
    }
    print!("{}", render(&config));
    Ok(())
}

/// Write the default configuration to `path`.
///
/// An existing file is left alone unless `force` is set.
fn run_init(path: &Path, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        println!("Configuration already exists at {}", path.display());
        println!("Use --force to overwrite it with defaults.");
        return Ok(());
    }

    ConfigFile::default().save_to(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn render(config: &ConfigFile) -> String {
    let p = &config.pipeline;
    let w = &config.window;
    format!(
        "[pipeline]\n  zoom_min = {}\n  zoom_max = {}\n  max_concurrency = {}\n  abort_on_level_error = {}\n\n\
         [window]\n  reference_zoom = {}\n  x = {}..{}\n  y = {}..{}\n\n\
         [storage]\n  database = {}\n  table = {}\n\n\
         [logging]\n  file = {}\n",
        p.zoom_min,
        p.zoom_max,
        p.max_concurrency,
        p.abort_on_level_error,
        w.reference_zoom,
        w.x_min,
        w.x_max,
        w.y_min,
        w.y_max,
        config.storage.database.display(),
        config.storage.table,
        config.logging.file.display(),
    )
}
