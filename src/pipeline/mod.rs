//! The footprint extraction pipeline.
//!
//! [`FootprintPipeline`] drives a run from raster windows to a validated
//! [`FeatureCollection`](crate::domain::FeatureCollection), reporting
//! degradations through [`RunReport`] and progress through
//! [`ProgressObserver`].

pub mod inference;
pub mod progress;
pub mod result;
pub mod runner;
pub mod stats;

pub use inference::{InferenceFailure, InferredWindow, MAX_BACKOFF, WindowInference, zero_nodata};
pub use progress::{PipelineStage, ProgressObserver, ProgressUpdate};
pub use result::{Extraction, RunOutcome, RunReport, SkippedComponent, SkippedWindow};
pub use runner::FootprintPipeline;
pub use stats::{PipelineStats, StatsManager};
