//! End-to-end properties of the footprint pipeline on synthetic rasters.

use ndarray::{Array2, Array3, ArrayView3, Axis};
use rooftrace::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

/// Returns the first band as the building probability.
#[derive(Debug)]
struct FirstBand;

impl InferenceAdapter for FirstBand {
    fn predict(&self, tile: ArrayView3<'_, f32>) -> Result<Array2<f32>, FootprintError> {
        Ok(tile.index_axis(Axis(2), 0).to_owned())
    }

    fn name(&self) -> &str {
        "first-band"
    }
}

/// Fails every call on tiles of one particular shape.
#[derive(Debug)]
struct FailsOnShape {
    rows: usize,
    cols: usize,
}

impl InferenceAdapter for FailsOnShape {
    fn predict(&self, tile: ArrayView3<'_, f32>) -> Result<Array2<f32>, FootprintError> {
        let (rows, cols, _) = tile.dim();
        if (rows, cols) == (self.rows, self.cols) {
            return Err(FootprintError::inference_message(self.name(), "model crashed"));
        }
        FirstBand.predict(tile)
    }

    fn name(&self) -> &str {
        "fails-on-shape"
    }
}

/// Fails the first `failures` calls, then behaves like [`FirstBand`].
#[derive(Debug)]
struct WarmsUp {
    failures: usize,
    calls: AtomicUsize,
}

impl InferenceAdapter for WarmsUp {
    fn predict(&self, tile: ArrayView3<'_, f32>) -> Result<Array2<f32>, FootprintError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
            return Err(FootprintError::inference_message(self.name(), "not ready"));
        }
        FirstBand.predict(tile)
    }

    fn name(&self) -> &str {
        "warms-up"
    }
}

/// Counts calls, then behaves like [`FirstBand`].
#[derive(Debug, Default)]
struct CountsCalls {
    calls: AtomicUsize,
}

impl InferenceAdapter for CountsCalls {
    fn predict(&self, tile: ArrayView3<'_, f32>) -> Result<Array2<f32>, FootprintError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(2));
        FirstBand.predict(tile)
    }

    fn name(&self) -> &str {
        "counts-calls"
    }
}

/// Sleeps on tiles of one particular shape.
#[derive(Debug)]
struct StallsOnShape {
    rows: usize,
    cols: usize,
    delay: Duration,
}

impl InferenceAdapter for StallsOnShape {
    fn predict(&self, tile: ArrayView3<'_, f32>) -> Result<Array2<f32>, FootprintError> {
        let (rows, cols, _) = tile.dim();
        if (rows, cols) == (self.rows, self.cols) {
            thread::sleep(self.delay);
        }
        FirstBand.predict(tile)
    }

    fn name(&self) -> &str {
        "stalls-on-shape"
    }
}

fn raster(
    size: usize,
    background: f32,
    fill: impl Fn(usize, usize) -> Option<f32>,
) -> InMemoryRaster {
    let data = Array3::from_shape_fn((size, size, 1), |(row, col, _)| {
        fill(row, col).unwrap_or(background)
    });
    InMemoryRaster::new(
        data,
        AffineTransform::north_up(1000.0, 2000.0, 0.5),
        Crs::new("EPSG:32633"),
    )
    .unwrap()
}

fn centered_square(size: usize, side: usize) -> InMemoryRaster {
    let start = (size - side) / 2;
    let range = start..start + side;
    raster(size, 0.1, move |row, col| {
        (range.contains(&row) && range.contains(&col)).then_some(0.9)
    })
}

fn exact_config() -> PipelineConfig {
    PipelineConfig::default()
        .with_tiling(256, 32)
        .with_morphology(0, 0)
        .with_min_component_pixels(1)
        .with_inference_policy(0, None, Duration::ZERO)
}

fn run(pipeline: &FootprintPipeline, raster: &InMemoryRaster) -> Extraction {
    pipeline
        .run(raster, &CancellationToken::new())
        .into_result()
        .unwrap()
}

#[test]
fn test_centered_square_becomes_one_polygon() {
    let raster = centered_square(512, 100);
    let pipeline = FootprintPipeline::new(exact_config(), Arc::new(FirstBand)).unwrap();
    let extraction = run(&pipeline, &raster);

    assert_eq!(extraction.collection.len(), 1);
    let feature = &extraction.collection.features[0];
    assert!((feature.area() - 100.0 * 100.0 * 0.25).abs() < 1e-6);
    assert!(feature.holes.is_empty());
    assert!(feature.exterior.is_ccw());
    assert_eq!(feature.exterior.len(), 4);

    let xs = feature.exterior.coords().iter().map(|c| c.x);
    let ys = feature.exterior.coords().iter().map(|c| c.y);
    let (min_x, max_x) = xs.fold((f64::MAX, f64::MIN), |(lo, hi), x| (lo.min(x), hi.max(x)));
    let (min_y, max_y) = ys.fold((f64::MAX, f64::MIN), |(lo, hi), y| (lo.min(y), hi.max(y)));
    assert!((min_x - 1103.0).abs() < 1e-9);
    assert!((max_x - 1153.0).abs() < 1e-9);
    assert!((min_y - 1847.0).abs() < 1e-9);
    assert!((max_y - 1897.0).abs() < 1e-9);

    assert_eq!(extraction.report.unclassified_pixels, 0);
    assert_eq!(extraction.report.stats.total_windows, 9);
    assert!(extraction.report.warnings().is_empty());
}

#[test]
fn test_repeated_runs_are_identical() {
    let raster = centered_square(300, 120);
    let config = exact_config().with_simplify_tolerance(0.75);
    let pipeline = FootprintPipeline::new(config, Arc::new(FirstBand)).unwrap();
    assert_eq!(run(&pipeline, &raster).collection, run(&pipeline, &raster).collection);
}

#[test]
fn test_failed_window_leaves_unclassified_corner() {
    let raster = raster(512, 0.9, |_, _| None);
    let pipeline = FootprintPipeline::new(
        exact_config().with_inference_policy(1, None, Duration::ZERO),
        Arc::new(FailsOnShape { rows: 128, cols: 128 }),
    )
    .unwrap();
    let outcome = pipeline.run(&raster, &CancellationToken::new());
    assert!(outcome.is_success());
    let extraction = outcome.into_result().unwrap();

    let report = &extraction.report;
    assert_eq!(report.skipped_windows.len(), 1);
    let skipped = &report.skipped_windows[0];
    assert_eq!(skipped.window.grid_index, (2, 2));
    assert_eq!(skipped.attempts, 2);
    assert_eq!(skipped.kind, ErrorKind::Inference);
    assert_eq!(report.unclassified_pixels, 64 * 64);
    assert_eq!(report.stats.failed_windows, 1);
    assert_eq!(report.stats.retries, 1);
    assert!(report.warnings().iter().any(|w| w.contains("unclassified")));

    assert_eq!(extraction.collection.len(), 1);
    let area_px = extraction.collection.features[0].area() / 0.25;
    assert!((area_px - (512.0 * 512.0 - 64.0 * 64.0)).abs() < 1e-6);

    let mask = &extraction.mask;
    assert_eq!(mask.foreground_count(), 512 * 512 - 64 * 64);
    assert!(!mask.get(500, 500));
    assert!(mask.get(400, 400));
}

#[test]
fn test_transient_failures_are_retried() {
    let raster = centered_square(256, 60);
    let adapter = Arc::new(WarmsUp {
        failures: 2,
        calls: AtomicUsize::new(0),
    });
    let config = exact_config()
        .with_tiling(128, 16)
        .with_inference_policy(2, None, Duration::from_millis(1))
        .with_parallel(ParallelPolicy::sequential());
    let pipeline = FootprintPipeline::new(config, adapter.clone()).unwrap();
    let extraction = run(&pipeline, &raster);

    assert!(extraction.report.skipped_windows.is_empty());
    assert_eq!(extraction.report.stats.retries, 2);
    assert_eq!(extraction.collection.len(), 1);
    assert_eq!(
        adapter.calls.load(Ordering::SeqCst),
        extraction.report.stats.total_windows + 2
    );
}

#[test]
fn test_stalled_window_times_out_and_is_skipped() {
    let raster = raster(320, 0.9, |_, _| None);
    let config = exact_config()
        .with_inference_policy(0, Some(Duration::from_millis(50)), Duration::ZERO);
    // 2x2 grid of 256 and 128 pixel windows; only the last one is 128x128
    let pipeline = FootprintPipeline::new(
        config,
        Arc::new(StallsOnShape {
            rows: 128,
            cols: 128,
            delay: Duration::from_millis(1000),
        }),
    )
    .unwrap();
    let extraction = run(&pipeline, &raster);

    let skipped = &extraction.report.skipped_windows;
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].kind, ErrorKind::Inference);
    assert!(skipped[0].reason.contains("timed out"));
}

#[test]
fn test_noise_is_removed_by_opening() {
    let raster = raster(128, 0.05, |row, col| {
        let building = (40..80).contains(&row) && (30..90).contains(&col);
        let speck = (row, col) == (10, 10) || (row, col) == (100, 20) || (row, col) == (5, 120);
        (building || speck).then_some(0.95)
    });
    let config = PipelineConfig::default()
        .with_tiling(64, 8)
        .with_inference_policy(0, None, Duration::ZERO);
    let pipeline = FootprintPipeline::new(config, Arc::new(FirstBand)).unwrap();
    let extraction = run(&pipeline, &raster);

    assert_eq!(extraction.collection.len(), 1);
    assert!((extraction.collection.total_area() - 40.0 * 60.0 * 0.25).abs() < 1e-6);
}

#[test]
fn test_ring_with_hole_survives_end_to_end() {
    let raster = raster(200, 0.0, |row, col| {
        let outer = (50..150).contains(&row) && (50..150).contains(&col);
        let inner = (80..120).contains(&row) && (80..120).contains(&col);
        (outer && !inner).then_some(1.0)
    });
    let pipeline = FootprintPipeline::new(exact_config(), Arc::new(FirstBand)).unwrap();
    let extraction = run(&pipeline, &raster);

    assert_eq!(extraction.collection.len(), 1);
    let feature = &extraction.collection.features[0];
    assert_eq!(feature.holes.len(), 1);
    assert!(!feature.holes[0].is_ccw());
    assert!((feature.area() - (100.0 * 100.0 - 40.0 * 40.0) * 0.25).abs() < 1e-6);
}

#[test]
fn test_geojson_output_is_well_formed() {
    let raster = centered_square(128, 20);
    let config = exact_config().with_tiling(64, 8);
    let pipeline = FootprintPipeline::new(config, Arc::new(FirstBand)).unwrap();
    let extraction = run(&pipeline, &raster);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("footprints.geojson");
    extraction.collection.write_geojson(&path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();

    assert_eq!(json["type"], "FeatureCollection");
    assert_eq!(json["crs"]["properties"]["name"], "EPSG:32633");
    let feature = &json["features"][0];
    assert_eq!(feature["geometry"]["type"], "Polygon");
    assert_eq!(feature["properties"]["component_id"], 0);
    let ring = feature["geometry"]["coordinates"][0].as_array().unwrap();
    assert_eq!(ring.len(), 5);
    assert_eq!(ring.first(), ring.last());
}

#[test]
fn test_cancellation_mid_run_reports_cancelled() {
    let raster = centered_square(512, 100);
    let token = CancellationToken::new();
    let trigger = token.clone();
    let config = exact_config()
        .with_tiling(64, 8)
        .with_parallel(ParallelPolicy::sequential());
    let pipeline = FootprintPipeline::new(config, Arc::new(FirstBand))
        .unwrap()
        .with_progress_observer(move |update: ProgressUpdate| {
            if update.completed == 3 {
                trigger.cancel();
            }
        });

    let outcome = pipeline.run(&raster, &token);
    assert!(outcome.is_cancelled());
    assert_eq!(outcome.error_kind(), Some(ErrorKind::Cancelled));
}

#[test]
fn test_cancellation_stops_parallel_workers() {
    let raster = centered_square(512, 100);
    let adapter = Arc::new(CountsCalls::default());
    let token = CancellationToken::new();
    let trigger = token.clone();
    let config = exact_config()
        .with_tiling(64, 8)
        .with_parallel(ParallelPolicy::new().with_max_threads(Some(2)));
    let pipeline = FootprintPipeline::new(config, adapter.clone())
        .unwrap()
        .with_progress_observer(move |update: ProgressUpdate| {
            if update.completed >= 4 {
                trigger.cancel();
            }
        });

    let outcome = pipeline.run(&raster, &token);
    assert!(outcome.is_cancelled());

    // 11x11 grid; only windows already in flight finish after the cancel
    let calls = adapter.calls.load(Ordering::SeqCst);
    assert!(calls >= 4);
    assert!(calls < 121);
}

#[test]
fn test_bad_configuration_fails_before_running() {
    let config = PipelineConfig::default().with_tiling(100, 50);
    let err = FootprintPipeline::new(config, Arc::new(FirstBand)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}
