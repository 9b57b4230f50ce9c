//! TilePyramid CLI - Command-line interface
//!
//! Runs the tile pyramid batch job and manages its configuration file.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::generate::GenerateArgs;

#[derive(Parser)]
#[command(name = "tilepyramid")]
#[command(version = tilepyramid::VERSION)]
#[command(about = "Generate a multi-resolution map tile pyramid", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate tiles for every zoom level from a GeoJSON feature collection
    Generate {
        /// GeoJSON file (FeatureCollection, Feature or geometry)
        #[arg(long, short)]
        input: PathBuf,

        /// Config file to use instead of ~/.tilepyramid/config.ini
        #[arg(long)]
        config: Option<PathBuf>,

        /// Lowest zoom level to generate
        #[arg(long)]
        zoom_min: Option<u8>,

        /// Highest zoom level to generate (inclusive)
        #[arg(long)]
        zoom_max: Option<u8>,

        /// Maximum tiles processed concurrently
        #[arg(long)]
        max_concurrency: Option<usize>,

        /// SQLite database receiving the tiles
        #[arg(long)]
        database: Option<PathBuf>,

        /// Destination table
        #[arg(long)]
        table: Option<String>,

        /// Keep going when a level has failed tiles
        #[arg(long)]
        continue_on_error: bool,

        /// Keep tiles in memory instead of writing the database
        #[arg(long)]
        dry_run: bool,

        /// Write the run report as JSON to this file
        #[arg(long)]
        report: Option<PathBuf>,

        /// Log to the file only
        #[arg(long, short)]
        quiet: bool,

        /// Enable debug logging
        #[arg(long)]
        debug: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate {
            input,
            config,
            zoom_min,
            zoom_max,
            max_concurrency,
            database,
            table,
            continue_on_error,
            dry_run,
            report,
            quiet,
            debug,
        } => commands::generate::run(GenerateArgs {
            input,
            config,
            zoom_min,
            zoom_max,
            max_concurrency,
            database,
            table,
            continue_on_error,
            dry_run,
            report,
            quiet,
            debug,
        }),
        Commands::Config { command } => commands::config::run(command),
    };

    if let Err(e) = result {
        e.exit();
    }
}
