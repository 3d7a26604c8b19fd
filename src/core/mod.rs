//! The core module of the footprint pipeline.
//!
//! This module contains the fundamental building blocks shared by every stage:
//! - Configuration management and validation
//! - Error handling
//! - Input validation helpers
//! - The inference adapter and raster source traits
//! - Cooperative cancellation
//!
//! It also provides re-exports of commonly used types for convenience.

pub mod cancel;
pub mod config;
pub mod errors;
pub mod traits;
pub mod validation;

pub use cancel::CancellationToken;
pub use config::{
    ConfigError, ConfigValidator, ConfigValidatorExt, ParallelPolicy, PipelineConfig,
    ProcessingStrategy,
};
pub use errors::{ErrorKind, FootprintError, FootprintResult, ProcessingStage};
pub use traits::{InferenceAdapter, RasterSource};
