//! # rooftrace
//!
//! A Rust library that extracts building footprints from georeferenced
//! imagery. Any segmentation model plugs in through a small adapter trait.
//! The library tiles the raster, stitches per-window probabilities, and
//! turns the result into clean GeoJSON polygons.
//!
//! ## Features
//!
//! - Overlapping window planning for rasters of any size
//! - Parallel per-window inference with retries and timeouts
//! - Probability mosaicking (overlaps reconcile to the mean)
//! - Threshold plus morphological opening and closing
//! - Crack-following vectorization with holes and 8-connectivity
//! - Douglas-Peucker simplification that never breaks polygon validity
//! - GeoJSON output tagged with the source CRS
//! - A run report listing every skipped window or component
//!
//! ## Modules
//!
//! * [`core`] - Errors, configuration, validation and the adapter/source traits
//! * [`domain`] - Rasters, affine transforms, windows and polygon features
//! * [`processors`] - Window planning, mosaic, mask, vectorizer and post-processing
//! * [`pipeline`] - The run driver, inference wrapper, progress and reports
//! * [`utils`] - Image loading and logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rooftrace::prelude::*;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # #[derive(Debug)]
//! # struct MyModel;
//! # impl InferenceAdapter for MyModel {
//! #     fn predict(&self, tile: ndarray::ArrayView3<'_, f32>)
//! #         -> Result<ndarray::Array2<f32>, FootprintError> {
//! #         Ok(ndarray::Array2::zeros((tile.dim().0, tile.dim().1)))
//! #     }
//! #     fn name(&self) -> &str { "my-model" }
//! # }
//! let raster = load_raster_image(
//!     Path::new("scene.png"),
//!     AffineTransform::north_up(500_000.0, 4_200_000.0, 0.3),
//!     Crs::new("EPSG:32633"),
//! )?;
//!
//! let config = PipelineConfig::from_json_str(r#"{ "tile_size": 512, "overlap_margin": 64 }"#)?;
//! let pipeline = FootprintPipeline::new(config, Arc::new(MyModel))?;
//!
//! match pipeline.run(&raster, &CancellationToken::new()) {
//!     RunOutcome::Success(extraction) => {
//!         for warning in extraction.report.warnings() {
//!             eprintln!("warning: {warning}");
//!         }
//!         extraction.collection.write_geojson("footprints.geojson")?;
//!     }
//!     RunOutcome::Cancelled => eprintln!("cancelled"),
//!     RunOutcome::Failed(err) => return Err(err.into()),
//! }
//! # Ok(())
//! # }
//! ```

// Core modules
pub mod core;
pub mod domain;

pub mod pipeline;
pub mod processors;
pub mod utils;

/// Prelude module for convenient imports.
///
/// Bring the essentials into scope with a single use statement:
///
/// ```rust
/// use rooftrace::prelude::*;
/// ```
///
/// Included items focus on running the pipeline end to end:
/// - The driver and its results (`FootprintPipeline`, `RunOutcome`, `Extraction`, `RunReport`)
/// - Configuration (`PipelineConfig`, `ParallelPolicy`)
/// - The seams (`InferenceAdapter`, `RasterSource`) and the in-memory raster
/// - Essential error and result types (`FootprintError`, `FootprintResult`)
///
/// For the individual stages, import from [`processors`] directly.
pub mod prelude {
    // Pipeline (essential)
    pub use crate::pipeline::{
        Extraction, FootprintPipeline, ProgressUpdate, RunOutcome, RunReport,
    };

    // Configuration and seams
    pub use crate::core::{
        CancellationToken, InferenceAdapter, ParallelPolicy, PipelineConfig, RasterSource,
    };

    // Domain
    pub use crate::domain::{
        AffineTransform, Crs, FeatureCollection, InMemoryRaster, PolygonFeature,
    };

    // Error Handling (essential)
    pub use crate::core::{ErrorKind, FootprintError, FootprintResult};

    // Image Utility (minimal)
    pub use crate::utils::load_raster_image;
}
