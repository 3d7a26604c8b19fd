//! Configuration management for the footprint pipeline.
//!
//! This module provides the run configuration, the parallel policy, and the
//! validation trait they share.

pub mod errors;
pub mod parallel;
pub mod pipeline;

pub use errors::{ConfigError, ConfigValidator, ConfigValidatorExt};
pub use parallel::{ParallelPolicy, ProcessingStrategy};
pub use pipeline::PipelineConfig;
