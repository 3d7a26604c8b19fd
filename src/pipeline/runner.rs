//! The footprint extraction driver.
//!
//! A run moves through five stages:
//!
//! 1. **Planning**: the raster is split into overlapping windows
//! 2. **Inference**: each window is read, passed to the adapter and
//!    accumulated into the shared probability mosaic (parallel)
//! 3. **Masking**: the reconciled mosaic is thresholded and cleaned
//! 4. **Vectorizing**: mask components are traced into polygons
//! 5. **Post-processing**: polygons are validated, simplified and filtered
//!
//! Adapter failures degrade the result (the window is skipped and reported);
//! raster read failures and internal errors abort the run.

use super::inference::{WindowInference, zero_nodata};
use super::progress::{PipelineStage, ProgressObserver, ProgressUpdate};
use super::result::{Extraction, RunOutcome, RunReport, SkippedComponent, SkippedWindow};
use super::stats::StatsManager;
use crate::core::cancel::CancellationToken;
use crate::core::config::{ConfigValidatorExt, PipelineConfig};
use crate::core::errors::{ErrorKind, FootprintError, ProcessingStage};
use crate::core::traits::{InferenceAdapter, RasterSource};
use crate::core::validation::validate_tile_shape;
use crate::domain::window::Window;
use crate::processors::{
    MaskBuilder, PolygonPostProcessor, ProbabilityMosaic, Vectorizer, WindowPlanner,
};
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Shared state of the inference stage.
struct InferenceState {
    mosaic: Mutex<ProbabilityMosaic>,
    skipped: Mutex<Vec<SkippedWindow>>,
    stats: StatsManager,
    completed: AtomicUsize,
    total: usize,
}

/// Extracts building footprints from a georeferenced raster.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use ndarray::{Array2, Array3, ArrayView3, Axis};
/// use rooftrace::prelude::*;
///
/// #[derive(Debug)]
/// struct FirstBand;
///
/// impl InferenceAdapter for FirstBand {
///     fn predict(&self, tile: ArrayView3<'_, f32>) -> Result<Array2<f32>, FootprintError> {
///         Ok(tile.index_axis(Axis(2), 0).mapv(|v| v.clamp(0.0, 1.0)))
///     }
///
///     fn name(&self) -> &str {
///         "first-band"
///     }
/// }
///
/// let raster = InMemoryRaster::new(
///     Array3::zeros((1024, 1024, 3)),
///     AffineTransform::north_up(500_000.0, 4_200_000.0, 0.5),
///     Crs::new("EPSG:32633"),
/// )?;
/// let pipeline = FootprintPipeline::new(PipelineConfig::default(), Arc::new(FirstBand))?;
/// let extraction = pipeline.run(&raster, &CancellationToken::new()).into_result()?;
/// extraction.collection.write_geojson("footprints.geojson")?;
/// # Ok::<(), FootprintError>(())
/// ```
#[derive(Clone)]
pub struct FootprintPipeline {
    config: PipelineConfig,
    inference: WindowInference,
    mask_builder: MaskBuilder,
    vectorizer: Vectorizer,
    post_processor: PolygonPostProcessor,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl std::fmt::Debug for FootprintPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FootprintPipeline")
            .field("config", &self.config)
            .field("adapter", &self.inference.adapter_name())
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl FootprintPipeline {
    /// Creates a pipeline after validating the configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid tiling, threshold, kernel
    /// sizes, tolerances, timeout or thread count.
    pub fn new(
        config: PipelineConfig,
        adapter: Arc<dyn InferenceAdapter>,
    ) -> Result<Self, FootprintError> {
        let config = config.validated()?;
        Ok(Self {
            inference: WindowInference::from_config(adapter, &config),
            mask_builder: MaskBuilder::from_config(&config),
            vectorizer: Vectorizer::new(config.min_component_pixels),
            post_processor: PolygonPostProcessor::from_config(&config),
            observer: None,
            config,
        })
    }

    /// Registers an observer notified at stage boundaries and per window.
    pub fn with_progress_observer(mut self, observer: impl ProgressObserver + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the full pipeline over `source`.
    ///
    /// Cancellation is checked before each window and between stages;
    /// in-flight inference calls are allowed to finish.
    pub fn run(&self, source: &dyn RasterSource, cancel: &CancellationToken) -> RunOutcome {
        let started = Instant::now();
        let outcome = RunOutcome::from(self.execute(source, cancel));
        match &outcome {
            RunOutcome::Success(extraction) => info!(
                "extracted {} footprint(s) in {:.2?}",
                extraction.collection.len(),
                started.elapsed()
            ),
            RunOutcome::Cancelled => info!("run cancelled after {:.2?}", started.elapsed()),
            RunOutcome::Failed(err) => warn!("run failed ({}): {}", err.kind(), err),
        }
        outcome
    }

    fn execute(
        &self,
        source: &dyn RasterSource,
        cancel: &CancellationToken,
    ) -> Result<Extraction, FootprintError> {
        let surface = source.surface();
        let (height, width) = surface.shape();
        check_cancelled(cancel)?;

        let planner = WindowPlanner::new(
            height,
            width,
            self.config.tile_size as usize,
            self.config.overlap_margin as usize,
        )?;
        let (grid_rows, grid_cols) = planner.grid_shape();
        info!(
            "planned {} window(s) ({}x{}) over a {}x{} raster with {} band(s)",
            planner.len(),
            grid_rows,
            grid_cols,
            height,
            width,
            surface.bands()
        );
        self.notify(PipelineStage::Planning, 1, 1);

        let state = InferenceState {
            mosaic: Mutex::new(ProbabilityMosaic::new(height, width)),
            skipped: Mutex::new(Vec::new()),
            stats: StatsManager::new(),
            completed: AtomicUsize::new(0),
            total: planner.len(),
        };
        self.notify(PipelineStage::Inference, 0, state.total);
        self.run_inference(source, &planner, &state, cancel)?;
        check_cancelled(cancel)?;

        let mosaic = state.mosaic.into_inner().map_err(|_| {
            FootprintError::lock_poisoned(ProcessingStage::Accumulation, "probability mosaic")
        })?;
        let mut skipped_windows = state.skipped.into_inner().map_err(|_| {
            FootprintError::lock_poisoned(ProcessingStage::Inference, "skipped windows")
        })?;
        skipped_windows.sort_by_key(|skipped| skipped.window.grid_index);
        let unclassified_pixels = mosaic.unclassified_count();
        if unclassified_pixels > 0 {
            warn!(
                "{} pixel(s) not covered by any successful window",
                unclassified_pixels
            );
        }

        let mask = self.mask_builder.build(&mosaic);
        drop(mosaic);
        self.notify(PipelineStage::Masking, 1, 1);
        check_cancelled(cancel)?;

        let vectorized = self.vectorizer.vectorize(&mask, surface)?;
        self.notify(PipelineStage::Vectorizing, 1, 1);
        check_cancelled(cancel)?;

        let traced = vectorized.features.len();
        let processed = self
            .post_processor
            .process(vectorized.features, surface.crs().clone());
        self.notify(PipelineStage::PostProcessing, traced, traced);

        let mut skipped_components: Vec<SkippedComponent> = vectorized
            .rejected
            .into_iter()
            .map(|(component_id, reason)| SkippedComponent {
                component_id,
                kind: ErrorKind::Geometry,
                reason,
            })
            .chain(
                processed
                    .rejected
                    .iter()
                    .map(|(id, err)| SkippedComponent::from_error(*id, err)),
            )
            .collect();
        skipped_components.sort_by_key(|skipped| skipped.component_id);

        let report = RunReport {
            skipped_windows,
            skipped_components,
            dropped_small_components: vectorized.dropped_small_components,
            filtered_small_polygons: processed.filtered_small_polygons,
            unclassified_pixels,
            simplification_fallbacks: processed.simplification_fallbacks,
            stats: state.stats.snapshot(),
        };
        debug!("{}", report);

        Ok(Extraction {
            collection: processed.collection,
            mask,
            report,
        })
    }

    fn run_inference(
        &self,
        source: &dyn RasterSource,
        planner: &WindowPlanner,
        state: &InferenceState,
        cancel: &CancellationToken,
    ) -> Result<(), FootprintError> {
        let process = |window: Window| self.process_window(source, window, state, cancel);
        let strategy = self.config.parallel.strategy();

        if !strategy.should_use_parallel(planner.len()) {
            debug!("Using sequential inference for {} windows", planner.len());
            return planner.windows().try_for_each(process);
        }

        let run_parallel = || planner.windows().par_bridge().try_for_each(&process);
        match self.config.parallel.max_threads {
            Some(threads) => {
                debug!(
                    "Using parallel inference for {} windows on {} threads",
                    planner.len(),
                    threads
                );
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("rooftrace-worker-{i}"))
                    .build()
                    .map_err(|e| {
                        FootprintError::processing_error(
                            ProcessingStage::Inference,
                            "building inference thread pool",
                            e,
                        )
                    })?;
                pool.install(run_parallel)
            }
            None => {
                debug!("Using parallel inference for {} windows", planner.len());
                run_parallel()
            }
        }
    }

    fn process_window(
        &self,
        source: &dyn RasterSource,
        window: Window,
        state: &InferenceState,
        cancel: &CancellationToken,
    ) -> Result<(), FootprintError> {
        check_cancelled(cancel)?;

        let surface = source.surface();
        let tile = source
            .read_window(&window)
            .map_err(|err| read_failure(&window, err))?;
        validate_tile_shape(tile.view(), window.height, window.width, surface.bands())
            .map_err(|err| read_failure(&window, err))?;
        let tile = Arc::new(tile);

        let started = Instant::now();
        let inferred = self.inference.infer(&window, Arc::clone(&tile));
        let elapsed = started.elapsed();

        match inferred {
            Ok(inferred) => {
                let mut probabilities = inferred.probabilities;
                if let Some(nodata) = surface.nodata() {
                    zero_nodata(&mut probabilities, tile.view(), nodata);
                }
                state
                    .mosaic
                    .lock()
                    .map_err(|_| {
                        FootprintError::lock_poisoned(
                            ProcessingStage::Accumulation,
                            "probability mosaic",
                        )
                    })?
                    .accumulate(&window, probabilities.view())?;
                state.stats.record_window(true, inferred.attempts, elapsed);
            }
            Err(failure) => {
                warn!(
                    "skipping window {} after {} attempt(s): {}",
                    window, failure.attempts, failure.error
                );
                state.stats.record_window(false, failure.attempts, elapsed);
                state
                    .skipped
                    .lock()
                    .map_err(|_| {
                        FootprintError::lock_poisoned(ProcessingStage::Inference, "skipped windows")
                    })?
                    .push(SkippedWindow {
                        window,
                        attempts: failure.attempts,
                        kind: failure.error.kind(),
                        reason: failure.error.to_string(),
                    });
            }
        }

        let completed = state.completed.fetch_add(1, Ordering::SeqCst) + 1;
        self.notify(PipelineStage::Inference, completed, state.total);
        Ok(())
    }

    fn notify(&self, stage: PipelineStage, completed: usize, total: usize) {
        if let Some(observer) = &self.observer {
            observer.on_progress(ProgressUpdate::new(stage, completed, total));
        }
    }
}

/// Any failure to get a well-formed tile out of the source is an IO error.
fn read_failure(window: &Window, err: FootprintError) -> FootprintError {
    match err {
        FootprintError::Io(_) => err,
        other => FootprintError::io_error(
            &format!("reading window {window}"),
            std::io::Error::new(std::io::ErrorKind::InvalidData, other.to_string()),
        ),
    }
}

fn check_cancelled(cancel: &CancellationToken) -> Result<(), FootprintError> {
    if cancel.is_cancelled() {
        Err(FootprintError::Cancelled)
    } else {
        Ok(())
    }
}
