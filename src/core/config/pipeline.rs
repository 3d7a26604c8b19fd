//! Configuration for a full footprint extraction run.

use super::errors::{ConfigError, ConfigValidator};
use super::parallel::ParallelPolicy;
use crate::core::errors::FootprintError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Every tunable of the pipeline, validated once before processing starts.
///
/// Serialized durations are expressed in milliseconds.
///
/// ```rust
/// use rooftrace::core::config::PipelineConfig;
///
/// let config = PipelineConfig::from_json_str(r#"{ "tile_size": 256, "overlap_margin": 32 }"#)?;
/// assert_eq!(config.tile_size, 256);
/// assert_eq!(config.threshold, 0.5);
/// # Ok::<(), rooftrace::core::FootprintError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Side length of an inference window, in pixels.
    pub tile_size: u32,
    /// Pixels of context shared with each neighbouring window.
    pub overlap_margin: u32,
    /// Reconciled probabilities strictly above this value become foreground.
    pub threshold: f32,
    /// Opening structuring-element size; `<= 1` disables opening.
    pub opening_kernel_size: u32,
    /// Closing structuring-element size; `<= 1` disables closing.
    pub closing_kernel_size: u32,
    /// Components with fewer pixels are dropped before tracing.
    pub min_component_pixels: usize,
    /// Douglas-Peucker tolerance in CRS units; `0` disables simplification.
    pub simplify_tolerance: f64,
    /// Polygons with a smaller area (CRS units squared) are filtered out.
    pub min_polygon_area: f64,
    /// Additional attempts after a failed inference call.
    pub inference_retries: u32,
    /// Per-call inference timeout.
    #[serde(with = "duration_ms_opt")]
    pub inference_timeout: Option<Duration>,
    /// Base delay between retries, doubled after each failed attempt.
    #[serde(with = "duration_ms")]
    pub retry_backoff: Duration,
    /// Parallelism of the inference stage.
    pub parallel: ParallelPolicy,
}

impl PipelineConfig {
    /// Create a new PipelineConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON; absent fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, FootprintError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, FootprintError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| FootprintError::io_error(&format!("reading {}", path.display()), e))?;
        Self::from_json_str(&text)
    }

    /// Set the tile size and overlap margin.
    pub fn with_tiling(mut self, tile_size: u32, overlap_margin: u32) -> Self {
        self.tile_size = tile_size;
        self.overlap_margin = overlap_margin;
        self
    }

    /// Set the probability threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the opening and closing kernel sizes.
    pub fn with_morphology(mut self, opening_kernel_size: u32, closing_kernel_size: u32) -> Self {
        self.opening_kernel_size = opening_kernel_size;
        self.closing_kernel_size = closing_kernel_size;
        self
    }

    /// Set the minimum component size in pixels.
    pub fn with_min_component_pixels(mut self, pixels: usize) -> Self {
        self.min_component_pixels = pixels;
        self
    }

    /// Set the simplification tolerance (CRS units).
    pub fn with_simplify_tolerance(mut self, tolerance: f64) -> Self {
        self.simplify_tolerance = tolerance;
        self
    }

    /// Set the minimum polygon area (CRS units squared).
    pub fn with_min_polygon_area(mut self, area: f64) -> Self {
        self.min_polygon_area = area;
        self
    }

    /// Set the retry count, per-call timeout and backoff for inference.
    pub fn with_inference_policy(
        mut self,
        retries: u32,
        timeout: Option<Duration>,
        backoff: Duration,
    ) -> Self {
        self.inference_retries = retries;
        self.inference_timeout = timeout;
        self.retry_backoff = backoff;
        self
    }

    /// Set the parallel policy.
    pub fn with_parallel(mut self, parallel: ParallelPolicy) -> Self {
        self.parallel = parallel;
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tile_size: 512,
            overlap_margin: 64,
            threshold: 0.5,
            opening_kernel_size: 3,
            closing_kernel_size: 3,
            min_component_pixels: 16,
            simplify_tolerance: 0.0,
            min_polygon_area: 0.0,
            inference_retries: 2,
            inference_timeout: None,
            retry_backoff: Duration::from_millis(100),
            parallel: ParallelPolicy::default(),
        }
    }
}

impl ConfigValidator for PipelineConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_tiling(self.tile_size, self.overlap_margin)?;
        self.validate_probability_threshold(self.threshold)?;
        self.validate_kernel_size(self.opening_kernel_size, "opening_kernel_size")?;
        self.validate_kernel_size(self.closing_kernel_size, "closing_kernel_size")?;
        self.validate_non_negative_f64(self.simplify_tolerance, "simplify_tolerance")?;
        self.validate_non_negative_f64(self.min_polygon_area, "min_polygon_area")?;

        if let Some(timeout) = self.inference_timeout {
            if timeout.is_zero() {
                return Err(ConfigError::InvalidConfig {
                    message: "inference_timeout must be greater than 0".to_string(),
                });
            }
        }

        if let Some(threads) = self.parallel.max_threads {
            self.validate_thread_count(threads)?;
        }

        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

mod duration_ms_opt {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&(duration.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
