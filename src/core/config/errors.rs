//! Configuration error types and validation traits.

use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The tile/overlap pair cannot produce a valid window grid.
    #[error("invalid tiling: tile_size {tile_size} must be positive and exceed twice the overlap margin {overlap_margin}")]
    InvalidTiling { tile_size: u32, overlap_margin: u32 },

    /// Error indicating that a configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Error indicating that a resource limit has been exceeded.
    #[error("resource limit exceeded: {message}")]
    ResourceLimitExceeded { message: String },
}

/// A trait for validating configuration parameters.
///
/// Implementors provide `validate` and `get_defaults`; the provided methods
/// cover the checks shared by the pipeline's configuration types.
pub trait ConfigValidator {
    /// Validates the configuration.
    fn validate(&self) -> Result<(), ConfigError>;

    /// Returns the default configuration.
    fn get_defaults() -> Self
    where
        Self: Sized;

    /// Validates a tile size against its overlap margin.
    ///
    /// Both must be positive and the tile must leave a non-empty stride
    /// (`tile_size - 2 * overlap_margin > 0`).
    fn validate_tiling(&self, tile_size: u32, overlap_margin: u32) -> Result<(), ConfigError> {
        if tile_size == 0 || overlap_margin == 0 || tile_size <= overlap_margin.saturating_mul(2)
        {
            Err(ConfigError::InvalidTiling {
                tile_size,
                overlap_margin,
            })
        } else {
            Ok(())
        }
    }

    /// Validates a probability threshold.
    ///
    /// This method checks that the threshold is finite and between 0.0 and 1.0.
    fn validate_probability_threshold(&self, threshold: f32) -> Result<(), ConfigError> {
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            Err(ConfigError::InvalidConfig {
                message: format!("threshold must be between 0.0 and 1.0, got {}", threshold),
            })
        } else {
            Ok(())
        }
    }

    /// Validates a morphology kernel size.
    ///
    /// Sizes map to an L-infinity radius of `size / 2`, which must fit in a `u8`.
    fn validate_kernel_size(&self, size: u32, field_name: &str) -> Result<(), ConfigError> {
        const MAX_KERNEL_SIZE: u32 = 511;

        if size > MAX_KERNEL_SIZE {
            Err(ConfigError::ResourceLimitExceeded {
                message: format!(
                    "{} {} exceeds maximum of {}",
                    field_name, size, MAX_KERNEL_SIZE
                ),
            })
        } else {
            Ok(())
        }
    }

    /// Validates thread count.
    fn validate_thread_count(&self, thread_count: usize) -> Result<(), ConfigError> {
        const MAX_REASONABLE_THREADS: usize = 256;

        if thread_count == 0 {
            Err(ConfigError::InvalidConfig {
                message: "Thread count must be greater than 0".to_string(),
            })
        } else if thread_count > MAX_REASONABLE_THREADS {
            Err(ConfigError::ResourceLimitExceeded {
                message: format!(
                    "Thread count {} exceeds reasonable maximum of {}",
                    thread_count, MAX_REASONABLE_THREADS
                ),
            })
        } else {
            Ok(())
        }
    }

    /// Validates a float value is finite and not negative.
    fn validate_non_negative_f64(&self, value: f64, field_name: &str) -> Result<(), ConfigError> {
        if !value.is_finite() || value < 0.0 {
            Err(ConfigError::InvalidConfig {
                message: format!(
                    "{} must be a finite value >= 0, got {}",
                    field_name, value
                ),
            })
        } else {
            Ok(())
        }
    }
}

/// Extension trait for ConfigValidator that wraps validation errors into
/// the pipeline error type.
pub trait ConfigValidatorExt: ConfigValidator {
    /// Validates configuration and wraps any errors into
    /// `FootprintError::Configuration`.
    fn validated(self) -> Result<Self, crate::core::errors::FootprintError>
    where
        Self: Sized,
    {
        self.validate()?;
        Ok(self)
    }
}

impl<T: ConfigValidator> ConfigValidatorExt for T {}
