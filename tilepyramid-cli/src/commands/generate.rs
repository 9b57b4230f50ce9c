//! Generate command - build the tile pyramid from a GeoJSON file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use tilepyramid::config::ConfigFile;
use tilepyramid::extract::FeatureIndex;
use tilepyramid::logging::LoggingOptions;
use tilepyramid::pipeline::{PipelineOrchestrator, PipelineReport};
use tilepyramid::store::{
    validate_table_name, MemoryTileStore, SqliteTileStore, TileStore, TileWriter,
};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the generate command.
#[derive(Debug, Default)]
pub struct GenerateArgs {
    pub input: PathBuf,
    pub config: Option<PathBuf>,
    pub zoom_min: Option<u8>,
    pub zoom_max: Option<u8>,
    pub max_concurrency: Option<usize>,
    pub database: Option<PathBuf>,
    pub table: Option<String>,
    pub continue_on_error: bool,
    pub dry_run: bool,
    pub report: Option<PathBuf>,
    pub quiet: bool,
    pub debug: bool,
}

/// Run the generate command.
pub fn run(args: GenerateArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(
        args.config.as_deref(),
        LoggingOptions {
            stdout: !args.quiet,
            debug: args.debug,
        },
    )?;
    runner.log_startup("generate");

    let settings = apply_overrides(runner.config().clone(), &args)?;
    let pipeline_config = settings.pipeline_config()?;

    let extractor = Arc::new(FeatureIndex::from_path(
        &args.input,
        pipeline_config.zoom_max,
    )?);

    let store: Arc<dyn TileStore> = if args.dry_run {
        info!("Dry run: tiles are kept in memory only");
        Arc::new(MemoryTileStore::new())
    } else {
        Arc::new(SqliteTileStore::open(
            &settings.storage.database,
            &settings.storage.table,
        )?)
    };
    let writer = Arc::new(TileWriter::new(store));
    let orchestrator = PipelineOrchestrator::new(pipeline_config, extractor, writer)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    let result = runtime.block_on(async {
        let cancel = CancellationToken::new();
        let signal_cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, finishing in-flight tiles");
                signal_cancel.cancel();
            }
        });

        orchestrator.run_until(&cancel).await
    });

    let report = match &result {
        Ok(report) => Some(report),
        Err(e) => e.report(),
    };
    if let Some(report) = report {
        if !args.quiet {
            print_summary(report);
        }
        if let Some(path) = &args.report {
            write_report(path, report)?;
        }
    }

    result?;
    Ok(())
}

/// Overlays command-line flags on the loaded configuration.
fn apply_overrides(mut config: ConfigFile, args: &GenerateArgs) -> Result<ConfigFile, CliError> {
    if let Some(zoom_min) = args.zoom_min {
        config.pipeline.zoom_min = zoom_min;
    }
    if let Some(zoom_max) = args.zoom_max {
        config.pipeline.zoom_max = zoom_max;
    }
    if let Some(max_concurrency) = args.max_concurrency {
        config.pipeline.max_concurrency = max_concurrency;
    }
    if args.continue_on_error {
        config.pipeline.abort_on_level_error = false;
    }
    if let Some(database) = &args.database {
        config.storage.database = database.clone();
    }
    if let Some(table) = &args.table {
        validate_table_name(table).map_err(|e| CliError::Config(e.to_string()))?;
        config.storage.table = table.clone();
    }
    Ok(config)
}

fn print_summary(report: &PipelineReport) {
    println!();
    println!("Levels");
    println!("======");
    for level in &report.levels {
        println!("  {}", level);
    }
    println!();
    println!(
        "Total: {} visited, {} written, {} skipped, {} empty, {} failed in {:.1}s",
        report.total_visited(),
        report.total_written(),
        report.total_skipped(),
        report.total_empty(),
        report.total_failed(),
        report.elapsed.as_secs_f64()
    );
    if report.cancelled {
        println!("Run was interrupted; re-run to complete the remaining tiles.");
    }
}

fn write_report(path: &Path, report: &PipelineReport) -> Result<(), CliError> {
    let file_error = |error: std::io::Error| CliError::FileWrite {
        path: path.display().to_string(),
        error,
    };

    let json = serde_json::to_string_pretty(report).map_err(|e| file_error(e.into()))?;
    std::fs::write(path, json).map_err(file_error)?;
    info!(path = %path.display(), "Wrote run report");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> PipelineReport {
        let mut report = PipelineReport::new(Default::default());
        report.cancelled = true;
        report
    }

    #[test]
    fn test_overrides_replace_config_values() {
        let args = GenerateArgs {
            zoom_min: Some(4),
            zoom_max: Some(9),
            max_concurrency: Some(12),
            database: Some(PathBuf::from("/tmp/out.sqlite")),
            table: Some("france".to_string()),
            continue_on_error: true,
            ..Default::default()
        };

        let config = apply_overrides(ConfigFile::default(), &args).unwrap();

        assert_eq!(config.pipeline.zoom_min, 4);
        assert_eq!(config.pipeline.zoom_max, 9);
        assert_eq!(config.pipeline.max_concurrency, 12);
        assert!(!config.pipeline.abort_on_level_error);
        assert_eq!(config.storage.database, PathBuf::from("/tmp/out.sqlite"));
        assert_eq!(config.storage.table, "france");
    }

    #[test]
    fn test_no_overrides_keeps_config() {
        let config = apply_overrides(ConfigFile::default(), &GenerateArgs::default()).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_invalid_table_override_is_config_error() {
        let args = GenerateArgs {
            table: Some("drop table".to_string()),
            ..Default::default()
        };
        let err = apply_overrides(ConfigFile::default(), &args).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn test_zero_concurrency_override_fails_validation() {
        let args = GenerateArgs {
            max_concurrency: Some(0),
            ..Default::default()
        };
        let config = apply_overrides(ConfigFile::default(), &args).unwrap();
        assert!(config.pipeline_config().is_err());
    }

    #[test]
    fn test_zoom_override_repairs_inverted_file_range() {
        let mut file = ConfigFile::default();
        file.pipeline.zoom_min = 12;
        file.pipeline.zoom_max = 10;
        assert!(file.pipeline_config().is_err());

        let args = GenerateArgs {
            zoom_max: Some(14),
            ..Default::default()
        };
        let pipeline = apply_overrides(file, &args)
            .unwrap()
            .pipeline_config()
            .unwrap();
        assert_eq!((pipeline.zoom_min, pipeline.zoom_max), (12, 14));
    }

    #[test]
    fn test_write_report() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("report.json");

        write_report(&path, &sample_report()).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["cancelled"], true);
        assert!(written["levels"].as_array().unwrap().is_empty());
    }
}
