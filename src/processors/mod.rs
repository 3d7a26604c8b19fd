//! Raster and vector processing stages of the footprint pipeline.
//!
//! # Modules
//!
//! * `window_planner` - Overlapping window grid over the raster
//! * `mosaic` - Accumulation of window probabilities into one surface
//! * `mask` - Thresholding and morphological opening/closing
//! * `vectorize` - Component labeling and boundary tracing
//! * `geometry` - Simplification and polygon validity
//! * `postprocess` - Simplification with fallback and area filtering

pub mod geometry;
pub mod mask;
pub mod mosaic;
pub mod postprocess;
pub mod vectorize;
pub mod window_planner;

pub use mask::{BinaryMask, MaskBuilder};
pub use mosaic::ProbabilityMosaic;
pub use postprocess::{PolygonPostProcessor, PostProcessOutput};
pub use vectorize::{
    ComponentInfo, ComponentLabels, SADDLE_OFFSET, VectorizeOutput, Vectorizer, label_components,
};
pub use window_planner::{WindowPlanner, Windows};
