//! Error type definitions for the footprint extraction pipeline.

use std::time::Duration;
use thiserror::Error;

/// Stage of the pipeline that raised a [`FootprintError::Processing`] error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessingStage {
    /// Error occurred while reading raster windows or running inference.
    Inference,
    /// Error occurred while accumulating window probabilities.
    Accumulation,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::Inference => write!(f, "inference"),
            ProcessingStage::Accumulation => write!(f, "mosaic accumulation"),
        }
    }
}

/// Coarse classification of a [`FootprintError`], used to report the
/// `Failed(kind)` state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid tile/overlap/threshold parameters or an unusable transform.
    Configuration,
    /// The inference adapter failed or timed out.
    Inference,
    /// A traced ring failed validity before simplification.
    Geometry,
    /// The raster could not be read or the output could not be written.
    Io,
    /// The run was cancelled cooperatively.
    Cancelled,
    /// Any other internal failure (shape mismatches, poisoned locks, ...).
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Configuration => "ConfigurationError",
            ErrorKind::Inference => "InferenceError",
            ErrorKind::Geometry => "GeometryError",
            ErrorKind::Io => "IOError",
            ErrorKind::Cancelled => "Cancelled",
            ErrorKind::Internal => "InternalError",
        };
        f.write_str(name)
    }
}

/// Enum representing the errors that can occur in the footprint pipeline.
#[derive(Error, Debug)]
pub enum FootprintError {
    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    Configuration {
        /// A message describing the configuration error.
        message: String,
    },

    /// The inference adapter returned an error or an unusable result.
    #[error("inference with '{adapter}' failed: {context}")]
    Inference {
        /// Name of the adapter that failed.
        adapter: String,
        /// Additional context about the failure.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The inference adapter did not answer within the configured timeout.
    #[error("inference with '{adapter}' timed out after {timeout:?}")]
    InferenceTimeout {
        /// Name of the adapter that timed out.
        adapter: String,
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// A traced polygon is invalid before simplification.
    #[error("geometry of component {component}: {message}")]
    Geometry {
        /// Discovery index of the connected component.
        component: usize,
        /// Description of the validity violation.
        message: String,
    },

    /// Error indicating invalid input.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Error occurred during processing.
    #[error("{kind} failed: {context}")]
    Processing {
        /// The stage of processing where the error occurred.
        kind: ProcessingStage,
        /// Additional context about the error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The run was cancelled before it produced a feature collection.
    #[error("run cancelled")]
    Cancelled,

    /// Error occurred while loading a raster image.
    #[error("image load")]
    ImageLoad(#[from] image::ImageError),

    /// JSON (de)serialization error for configs and GeoJSON output.
    #[error("serialization")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}

impl FootprintError {
    /// Returns the coarse kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FootprintError::Configuration { .. } => ErrorKind::Configuration,
            FootprintError::Inference { .. } | FootprintError::InferenceTimeout { .. } => {
                ErrorKind::Inference
            }
            FootprintError::Geometry { .. } => ErrorKind::Geometry,
            FootprintError::ImageLoad(_)
            | FootprintError::Serialization(_)
            | FootprintError::Io(_) => ErrorKind::Io,
            FootprintError::Cancelled => ErrorKind::Cancelled,
            FootprintError::InvalidInput { .. } | FootprintError::Processing { .. } => {
                ErrorKind::Internal
            }
        }
    }

    /// Returns true if retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Inference
    }
}

/// Plain message error used as the `source` of wrapped errors when no
/// richer error value exists.
#[derive(Debug, Clone)]
pub struct SimpleError {
    message: String,
}

impl SimpleError {
    /// Creates a new error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SimpleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for SimpleError {}

impl From<crate::core::config::ConfigError> for FootprintError {
    fn from(error: crate::core::config::ConfigError) -> Self {
        Self::Configuration {
            message: error.to_string(),
        }
    }
}
