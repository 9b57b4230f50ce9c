//! Pipeline orchestrator.
//!
//! Sweeps the zoom range in ascending order. Each level gets a fresh
//! [`CoordinateSpace`] which is drained through the [`BoundedExecutor`]; a
//! level must settle completely before the next one starts.
//!
//! For every coordinate the handler runs the extractor on the blocking pool
//! and, if the tile has content, hands it to the shared [`TileWriter`].
//! Writes are insert-or-ignore, so a partially written level is safe to run
//! again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::error::{PipelineError, TileError};
use super::executor::{BoundedExecutor, ItemFailure};
use super::report::{LevelReport, PipelineReport};
use crate::coord::{BoundingWindow, CoordinateSpace, TileCoord, MAX_ZOOM};
use crate::extract::TileExtractor;
use crate::store::{TileRecord, TileWriter, WriteOutcome};

/// Default number of tiles processed concurrently.
pub const DEFAULT_MAX_CONCURRENCY: usize = 50;

/// Default zoom range.
pub const DEFAULT_ZOOM_MIN: u8 = 0;
pub const DEFAULT_ZOOM_MAX: u8 = 14;

/// Failures kept and logged individually per level; the rest are counted.
const MAX_LOGGED_FAILURES: usize = 100;

/// Settings for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub zoom_min: u8,
    pub zoom_max: u8,
    pub max_concurrency: usize,
    pub window: BoundingWindow,
    /// Stop after the first level that has failed tiles
    pub abort_on_level_error: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            zoom_min: DEFAULT_ZOOM_MIN,
            zoom_max: DEFAULT_ZOOM_MAX,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            window: BoundingWindow::default(),
            abort_on_level_error: true,
        }
    }
}

impl PipelineConfig {
    pub fn with_zoom_range(mut self, zoom_min: u8, zoom_max: u8) -> Self {
        self.zoom_min = zoom_min;
        self.zoom_max = zoom_max;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn with_window(mut self, window: BoundingWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_abort_on_level_error(mut self, abort: bool) -> Self {
        self.abort_on_level_error = abort;
        self
    }

    /// Checks the settings without touching the store.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.zoom_max > MAX_ZOOM {
            return Err(PipelineError::ZoomTooHigh {
                zoom_max: self.zoom_max,
                limit: MAX_ZOOM,
            });
        }
        if self.zoom_min > self.zoom_max {
            return Err(PipelineError::InvalidZoomRange {
                zoom_min: self.zoom_min,
                zoom_max: self.zoom_max,
            });
        }
        if self.max_concurrency == 0 {
            return Err(PipelineError::ZeroConcurrency);
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct LevelCounters {
    written: AtomicU64,
    skipped: AtomicU64,
    empty: AtomicU64,
}

/// Drives tile generation level by level.
pub struct PipelineOrchestrator {
    config: PipelineConfig,
    extractor: Arc<dyn TileExtractor>,
    writer: Arc<TileWriter>,
    executor: BoundedExecutor,
}

impl PipelineOrchestrator {
    /// Validates `config` and wires the collaborators together.
    pub fn new(
        config: PipelineConfig,
        extractor: Arc<dyn TileExtractor>,
        writer: Arc<TileWriter>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;

        if config.zoom_max > extractor.max_zoom() {
            return Err(PipelineError::Config(format!(
                "zoom_max {} is above the extractor's max zoom {}",
                config.zoom_max,
                extractor.max_zoom()
            )));
        }

        let executor = BoundedExecutor::new(config.max_concurrency, "tiles")
            .map_err(|_| PipelineError::ZeroConcurrency)?
            .with_failure_limit(MAX_LOGGED_FAILURES);

        Ok(Self {
            config,
            extractor,
            writer,
            executor,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn writer(&self) -> &Arc<TileWriter> {
        &self.writer
    }

    /// Processes every level from `zoom_min` to `zoom_max`.
    pub async fn run(&self) -> Result<PipelineReport, PipelineError> {
        self.run_until(&CancellationToken::new()).await
    }

    /// Like [`run`](Self::run), but stops admitting tiles once `cancel`
    /// fires. In-flight tiles finish and no further level starts.
    pub async fn run_until(
        &self,
        cancel: &CancellationToken,
    ) -> Result<PipelineReport, PipelineError> {
        let started = Instant::now();
        let mut report = PipelineReport::new(Utc::now());

        info!(
            zoom_min = self.config.zoom_min,
            zoom_max = self.config.zoom_max,
            max_concurrency = self.config.max_concurrency,
            store = %self.writer.store().describe(),
            "Pipeline started"
        );

        self.writer.prepare().await?;

        for zoom in self.config.zoom_min..=self.config.zoom_max {
            if cancel.is_cancelled() {
                report.cancelled = true;
                warn!(zoom, "Cancelled before level start");
                break;
            }

            let level = self.run_level(zoom, cancel).await?;
            let failed = level.failed;
            let cancelled = level.cancelled;
            report.levels.push(level);

            if cancelled {
                report.cancelled = true;
                warn!(zoom, "Level cancelled, remaining levels skipped");
                break;
            }

            if failed > 0 && self.config.abort_on_level_error {
                report.finish(started.elapsed());
                error!(zoom, failed, "Level failed, aborting pipeline");
                return Err(PipelineError::LevelFailed {
                    zoom,
                    failed,
                    report: Box::new(report),
                });
            }
        }

        report.finish(started.elapsed());

        info!(
            levels = report.levels.len(),
            visited = report.total_visited(),
            written = report.total_written(),
            skipped = report.total_skipped(),
            empty = report.total_empty(),
            failed = report.total_failed(),
            cancelled = report.cancelled,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Pipeline finished"
        );

        let failed = report.total_failed();
        if failed > 0 {
            let levels = report.levels.iter().filter(|l| !l.is_clean()).count();
            return Err(PipelineError::CompletedWithFailures {
                failed,
                levels,
                report: Box::new(report),
            });
        }

        Ok(report)
    }

    async fn run_level(
        &self,
        zoom: u8,
        cancel: &CancellationToken,
    ) -> Result<LevelReport, PipelineError> {
        let space = CoordinateSpace::new(zoom, &self.config.window)?;
        let expected = space.remaining();
        let started_at = Utc::now();
        let started = Instant::now();

        info!(zoom, tiles = expected, started_at = %started_at.to_rfc3339(), "Level started");

        let counters = Arc::new(LevelCounters::default());
        let handler = {
            let extractor = Arc::clone(&self.extractor);
            let writer = Arc::clone(&self.writer);
            let counters = Arc::clone(&counters);
            move |coord: TileCoord| {
                let extractor = Arc::clone(&extractor);
                let writer = Arc::clone(&writer);
                let counters = Arc::clone(&counters);
                async move { process_tile(coord, extractor, writer, counters).await }
            }
        };

        let outcome = self.executor.run_until(space, handler, cancel).await;
        let (summary, failures, omitted) = match outcome {
            Ok(summary) => (summary, Vec::new(), 0),
            Err(e) => {
                let omitted = e.omitted();
                (e.summary, e.failures, omitted)
            }
        };

        log_failures(zoom, &failures, omitted);

        let report = LevelReport {
            zoom,
            started_at,
            finished_at: Utc::now(),
            elapsed: started.elapsed(),
            expected,
            visited: summary.admitted,
            written: counters.written.load(Ordering::Relaxed),
            skipped: counters.skipped.load(Ordering::Relaxed),
            empty: counters.empty.load(Ordering::Relaxed),
            failed: summary.failed + summary.lost,
            peak_in_flight: summary.peak_in_flight,
            cancelled: summary.cancelled,
        };

        info!(
            zoom,
            elapsed_ms = report.elapsed.as_millis() as u64,
            visited = report.visited,
            written = report.written,
            skipped = report.skipped,
            empty = report.empty,
            failed = report.failed,
            peak_in_flight = report.peak_in_flight,
            "Level finished"
        );

        Ok(report)
    }
}

impl std::fmt::Debug for PipelineOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineOrchestrator")
            .field("config", &self.config)
            .field("writer", &self.writer)
            .finish()
    }
}

/// Extracts one tile and stores it if it has content.
async fn process_tile(
    coord: TileCoord,
    extractor: Arc<dyn TileExtractor>,
    writer: Arc<TileWriter>,
    counters: Arc<LevelCounters>,
) -> Result<(), TileError> {
    let payload = tokio::task::spawn_blocking(move || extractor.extract(&coord))
        .await
        .map_err(|e| TileError::ExtractorPanicked(e.to_string()))??;

    let Some(payload) = payload else {
        counters.empty.fetch_add(1, Ordering::Relaxed);
        return Ok(());
    };

    match writer.write(TileRecord::new(coord, payload)).await? {
        WriteOutcome::Inserted => counters.written.fetch_add(1, Ordering::Relaxed),
        WriteOutcome::AlreadyPresent => counters.skipped.fetch_add(1, Ordering::Relaxed),
    };
    Ok(())
}

fn log_failures(zoom: u8, failures: &[ItemFailure<TileCoord, TileError>], omitted: u64) {
    for failure in failures {
        error!(
            zoom,
            x = failure.item.x,
            y = failure.item.y,
            error = %failure.cause,
            "Tile failed"
        );
    }
    if omitted > 0 {
        warn!(zoom, omitted, "Further tile failures not logged");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractError;
    use crate::store::MemoryTileStore;

    /// Returns a payload for every tile whose column is even.
    struct EvenColumns;

    impl TileExtractor for EvenColumns {
        fn extract(&self, coord: &TileCoord) -> Result<Option<Vec<u8>>, ExtractError> {
            if coord.x % 2 == 0 {
                Ok(Some(coord.to_string().into_bytes()))
            } else {
                Ok(None)
            }
        }
    }

    struct CappedAt(u8);

    impl TileExtractor for CappedAt {
        fn extract(&self, _coord: &TileCoord) -> Result<Option<Vec<u8>>, ExtractError> {
            Ok(None)
        }

        fn max_zoom(&self) -> u8 {
            self.0
        }
    }

    fn writer() -> Arc<TileWriter> {
        Arc::new(TileWriter::new(Arc::new(MemoryTileStore::new())))
    }

    fn world(zoom_min: u8, zoom_max: u8) -> PipelineConfig {
        PipelineConfig::default()
            .with_window(BoundingWindow::world())
            .with_zoom_range(zoom_min, zoom_max)
            .with_max_concurrency(4)
    }

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.zoom_min, 0);
        assert_eq!(config.zoom_max, 14);
        assert_eq!(config.max_concurrency, 50);
        assert!(config.abort_on_level_error);
        assert_eq!(config.window, BoundingWindow::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_configs_are_rejected() {
        let cases = [
            (
                PipelineConfig::default().with_zoom_range(5, 3),
                "InvalidZoomRange",
            ),
            (
                PipelineConfig::default().with_zoom_range(0, 25),
                "ZoomTooHigh",
            ),
            (
                PipelineConfig::default().with_max_concurrency(0),
                "ZeroConcurrency",
            ),
        ];

        for (config, expected) in cases {
            let err = PipelineOrchestrator::new(config, Arc::new(EvenColumns), writer())
                .unwrap_err();
            assert!(
                format!("{:?}", err).starts_with(expected),
                "expected {}, got {:?}",
                expected,
                err
            );
            assert!(err.is_config_error());
        }
    }

    #[test]
    fn test_zoom_above_extractor_limit_is_rejected() {
        let err = PipelineOrchestrator::new(world(0, 8), Arc::new(CappedAt(6)), writer())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[tokio::test]
    async fn test_runs_levels_in_order_and_counts() {
        let orchestrator =
            PipelineOrchestrator::new(world(0, 3), Arc::new(EvenColumns), writer()).unwrap();

        let report = orchestrator.run().await.unwrap();

        let zooms: Vec<u8> = report.levels.iter().map(|l| l.zoom).collect();
        assert_eq!(zooms, vec![0, 1, 2, 3]);

        for level in &report.levels {
            let n = 1u64 << level.zoom;
            assert_eq!(level.expected, n * n);
            assert_eq!(level.visited, n * n);
            assert_eq!(level.written + level.empty, n * n);
            assert_eq!(level.failed, 0);
        }
        for pair in report.levels.windows(2) {
            assert!(pair[0].finished_at <= pair[1].started_at);
        }

        // Even columns: z0 1, z1 2, z2 8, z3 32
        assert_eq!(report.total_written(), 43);
        assert_eq!(orchestrator.writer().store().count().await.unwrap(), 43);
        assert!(report.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_pre_cancelled_run_does_nothing() {
        let orchestrator =
            PipelineOrchestrator::new(world(0, 3), Arc::new(EvenColumns), writer()).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = orchestrator.run_until(&cancel).await.unwrap();
        assert!(report.cancelled);
        assert!(report.levels.is_empty());
        assert_eq!(orchestrator.writer().stats().attempted(), 0);
    }
}
