//! Integration tests for the tile pyramid pipeline.
//!
//! These tests drive the orchestrator end to end against both stores:
//! - Level-by-level ordering and per-level accounting
//! - Concurrency bound on in-flight tiles
//! - Idempotent re-runs against SQLite
//! - Abort and continue policies on tile failures, and resuming after them
//! - GeoJSON extraction into vector tiles in a real database

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mvt_reader::Reader;
use parking_lot::Mutex;
use tempfile::TempDir;
use tilepyramid::coord::{BoundingWindow, CoordinateSpace, TileCoord};
use tilepyramid::extract::{ExtractError, FeatureIndex, TileExtractor, LAYER_NAME};
use tilepyramid::pipeline::{
    PipelineConfig, PipelineError, PipelineOrchestrator, PipelineReport,
};
use tilepyramid::store::{MemoryTileStore, SqliteTileStore, TileStore, TileWriter};

// =============================================================================
// Test Helpers
// =============================================================================

/// Records every coordinate it is asked for and returns a payload for each.
#[derive(Default)]
struct RecordingExtractor {
    calls: Mutex<Vec<TileCoord>>,
}

impl RecordingExtractor {
    fn calls(&self) -> Vec<TileCoord> {
        self.calls.lock().clone()
    }
}

impl TileExtractor for RecordingExtractor {
    fn extract(&self, coord: &TileCoord) -> Result<Option<Vec<u8>>, ExtractError> {
        self.calls.lock().push(*coord);
        Ok(Some(coord.to_string().into_bytes()))
    }
}

/// Tracks how many extractions overlap in time.
#[derive(Default)]
struct SlowExtractor {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl TileExtractor for SlowExtractor {
    fn extract(&self, _coord: &TileCoord) -> Result<Option<Vec<u8>>, ExtractError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(5));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(Some(vec![0u8]))
    }
}

/// Fails every tile in column 0 at one zoom level.
struct FailsAtZoom(u8);

impl TileExtractor for FailsAtZoom {
    fn extract(&self, coord: &TileCoord) -> Result<Option<Vec<u8>>, ExtractError> {
        if coord.zoom == self.0 && coord.x == 0 {
            return Err(ExtractError::InvalidGeoJson(format!("broken tile {}", coord)));
        }
        Ok(Some(vec![1u8]))
    }
}

fn world(zoom_min: u8, zoom_max: u8, max_concurrency: usize) -> PipelineConfig {
    PipelineConfig::default()
        .with_window(BoundingWindow::world())
        .with_zoom_range(zoom_min, zoom_max)
        .with_max_concurrency(max_concurrency)
}

fn memory_writer() -> (Arc<MemoryTileStore>, Arc<TileWriter>) {
    let store = Arc::new(MemoryTileStore::new());
    let writer = Arc::new(TileWriter::new(store.clone()));
    (store, writer)
}

fn single_tile_window() -> BoundingWindow {
    BoundingWindow::new(13, 3900, 3901, 2700, 2701).unwrap()
}

/// Runs `config` into the database at `db`, returning the outcome and the
/// row count afterwards.
async fn run_into_sqlite(
    db: &Path,
    config: PipelineConfig,
    extractor: Arc<dyn TileExtractor>,
) -> (Result<PipelineReport, PipelineError>, u64) {
    let store: Arc<dyn TileStore> = Arc::new(SqliteTileStore::open(db, "tiles").unwrap());
    let writer = Arc::new(TileWriter::new(store.clone()));
    let result = PipelineOrchestrator::new(config, extractor, writer)
        .unwrap()
        .run()
        .await;
    let count = store.count().await.unwrap();
    (result, count)
}

async fn run_world_into_sqlite(db: &Path) -> (PipelineReport, u64) {
    let (result, count) =
        run_into_sqlite(db, world(0, 3, 4), Arc::new(RecordingExtractor::default())).await;
    (result.unwrap(), count)
}

// =============================================================================
// Ordering and Accounting
// =============================================================================

#[tokio::test]
async fn test_levels_run_in_order_and_visit_every_tile_once() {
    let extractor = Arc::new(RecordingExtractor::default());
    let (store, writer) = memory_writer();

    let orchestrator =
        PipelineOrchestrator::new(world(0, 4, 8), extractor.clone(), writer).unwrap();
    let report = orchestrator.run().await.unwrap();

    let calls = extractor.calls();
    assert_eq!(calls.len(), 1 + 4 + 16 + 64 + 256);

    // A level never starts before the previous one has drained.
    let zooms: Vec<u8> = calls.iter().map(|c| c.zoom).collect();
    assert!(zooms.windows(2).all(|w| w[0] <= w[1]));

    let unique: HashSet<TileCoord> = calls.iter().copied().collect();
    assert_eq!(unique.len(), calls.len());

    assert_eq!(report.levels.len(), 5);
    for (zoom, level) in report.levels.iter().enumerate() {
        assert_eq!(level.zoom as usize, zoom);
        assert_eq!(level.expected, 4u64.pow(zoom as u32));
        assert_eq!(level.visited, level.expected);
        assert_eq!(level.written, level.expected);
        assert!(level.is_clean());
    }
    assert_eq!(store.len(), 341);
    assert!(!report.cancelled);
    assert!(report.finished_at.is_some());
}

#[tokio::test]
async fn test_single_tile_window_yields_one_coordinate() {
    let extractor = Arc::new(RecordingExtractor::default());
    let (store, writer) = memory_writer();

    let config = PipelineConfig::default()
        .with_window(single_tile_window())
        .with_zoom_range(13, 13);
    let report = PipelineOrchestrator::new(config, extractor.clone(), writer)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(extractor.calls(), vec![TileCoord::new(13, 3900, 2700).unwrap()]);
    assert_eq!(report.total_written(), 1);
    assert_eq!(store.len(), 1);
}

#[test]
fn test_window_below_reference_zoom_covers_full_grid() {
    let window = single_tile_window();

    let z12 = CoordinateSpace::new(12, &window).unwrap();
    assert_eq!(z12.remaining(), 4096 * 4096);
    assert_eq!(z12.range().x_max, 4096);

    let z13: Vec<TileCoord> = CoordinateSpace::new(13, &window).unwrap().collect();
    assert_eq!(z13, vec![TileCoord::new(13, 3900, 2700).unwrap()]);

    let z14 = CoordinateSpace::new(14, &window).unwrap();
    assert_eq!(z14.remaining(), 4);
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_in_flight_tiles_never_exceed_limit() {
    let extractor = Arc::new(SlowExtractor::default());
    let (_, writer) = memory_writer();

    let orchestrator =
        PipelineOrchestrator::new(world(0, 3, 3), extractor.clone(), writer).unwrap();
    let report = orchestrator.run().await.unwrap();

    assert!(extractor.peak.load(Ordering::SeqCst) <= 3);
    for level in &report.levels {
        assert!(level.peak_in_flight <= 3);
    }
    // Level 3 has 64 tiles, so the limit is reached.
    assert_eq!(report.level(3).unwrap().peak_in_flight, 3);
}

#[tokio::test]
async fn test_peak_in_flight_never_exceeds_level_size() {
    let (_, writer) = memory_writer();
    let config = PipelineConfig::default()
        .with_window(single_tile_window())
        .with_zoom_range(13, 14)
        .with_max_concurrency(50);

    let report = PipelineOrchestrator::new(config, Arc::new(RecordingExtractor::default()), writer)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.level(13).unwrap().expected, 1);
    assert_eq!(report.level(13).unwrap().peak_in_flight, 1);

    let z14 = report.level(14).unwrap();
    assert_eq!(z14.expected, 4);
    assert!((1..=4).contains(&z14.peak_in_flight));
}

// =============================================================================
// Idempotency
// =============================================================================

#[tokio::test]
async fn test_rerun_against_sqlite_writes_nothing_new() {
    let temp = TempDir::new().unwrap();
    let db = temp.path().join("out").join("tiles.sqlite");

    let (first, first_count) = run_world_into_sqlite(&db).await;
    assert_eq!(first.total_written(), 85);
    assert_eq!(first.total_skipped(), 0);
    assert_eq!(first_count, 85);

    let (second, second_count) = run_world_into_sqlite(&db).await;
    assert_eq!(second.total_written(), 0);
    assert_eq!(second.total_skipped(), 85);
    assert_eq!(second.total_failed(), 0);
    assert_eq!(second_count, 85);
}

// =============================================================================
// Failure Policies
// =============================================================================

#[tokio::test]
async fn test_abort_stops_after_failed_level() {
    let (store, writer) = memory_writer();

    let err = PipelineOrchestrator::new(world(0, 3, 4), Arc::new(FailsAtZoom(1)), writer)
        .unwrap()
        .run()
        .await
        .unwrap_err();

    match err {
        PipelineError::LevelFailed {
            zoom,
            failed,
            report,
        } => {
            assert_eq!(zoom, 1);
            assert_eq!(failed, 2);
            assert_eq!(report.levels.len(), 2);
            assert!(report.level(2).is_none());
            // The rest of the failed level still ran.
            assert_eq!(report.level(1).unwrap().written, 2);
        }
        other => panic!("expected LevelFailed, got {other}"),
    }
    assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn test_continue_runs_every_level_and_reports_failures() {
    let (store, writer) = memory_writer();
    let config = world(0, 3, 4).with_abort_on_level_error(false);

    let err = PipelineOrchestrator::new(config, Arc::new(FailsAtZoom(2)), writer)
        .unwrap()
        .run()
        .await
        .unwrap_err();

    match err {
        PipelineError::CompletedWithFailures {
            failed,
            levels,
            report,
        } => {
            assert_eq!(failed, 4);
            assert_eq!(levels, 1);
            assert_eq!(report.levels.len(), 4);
            assert_eq!(report.level(2).unwrap().failed, 4);
            assert_eq!(report.total_visited(), 85);
        }
        other => panic!("expected CompletedWithFailures, got {other}"),
    }
    assert_eq!(store.len(), 81);
}

#[tokio::test]
async fn test_rerun_after_aborted_level_fills_only_missing_tiles() {
    let temp = TempDir::new().unwrap();
    let db = temp.path().join("tiles.sqlite");

    let (failed, stored) = run_into_sqlite(&db, world(0, 3, 4), Arc::new(FailsAtZoom(2))).await;
    assert!(matches!(
        failed,
        Err(PipelineError::LevelFailed {
            zoom: 2,
            failed: 4,
            ..
        })
    ));
    // z0 and z1 complete, z2 without column 0, z3 never started.
    assert_eq!(stored, 1 + 4 + 12);

    let extractor = Arc::new(RecordingExtractor::default());
    let (resumed, count) = run_into_sqlite(&db, world(0, 3, 4), extractor.clone()).await;
    let resumed = resumed.unwrap();

    assert_eq!(resumed.total_skipped(), stored);
    assert_eq!(resumed.total_written(), 85 - stored);
    assert_eq!(resumed.total_failed(), 0);

    let z2 = resumed.level(2).unwrap();
    assert_eq!((z2.written, z2.skipped), (4, 12));
    assert_eq!(resumed.level(3).unwrap().written, 64);
    assert_eq!(count, 85);

    // Every tile is extracted again; only the write is skipped.
    assert_eq!(extractor.calls().len(), 85);
}

// =============================================================================
// GeoJSON End to End
// =============================================================================

#[tokio::test]
async fn test_geojson_point_lands_in_one_tile_per_level() {
    let temp = TempDir::new().unwrap();
    let db = temp.path().join("tiles.sqlite");
    let geojson = r#"{
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": { "name": "paris" },
            "geometry": { "type": "Point", "coordinates": [2.35, 48.85] }
        }]
    }"#;

    let extractor = Arc::new(FeatureIndex::from_json(geojson, 4).unwrap());
    let store = Arc::new(SqliteTileStore::open(&db, "networks").unwrap());
    let writer = Arc::new(TileWriter::new(store.clone()));

    let report = PipelineOrchestrator::new(world(0, 4, 16), extractor, writer)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.total_visited(), 341);
    assert_eq!(report.total_written(), 5);
    assert_eq!(report.total_empty(), 336);
    for level in &report.levels {
        assert_eq!(level.written, 1);
    }

    // z4 tile containing Paris.
    let payload = store.get(TileCoord::new(4, 8, 5).unwrap()).await.unwrap();
    let reader = Reader::new(payload.unwrap()).unwrap();
    assert_eq!(reader.get_layer_names().unwrap(), vec![LAYER_NAME.to_string()]);
    let features = reader.get_features(0).unwrap();
    assert_eq!(features.len(), 1);
    assert_eq!(features[0].id, Some(0));
}
