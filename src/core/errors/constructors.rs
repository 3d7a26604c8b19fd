//! Error constructor utilities for the footprint pipeline.
//!
//! These helpers keep error construction terse at call sites and make sure
//! messages carry the field or component they refer to.

use super::types::{FootprintError, ProcessingStage, SimpleError};
use std::time::Duration;

impl FootprintError {
    /// Internal helper to build a Processing error with minimal boilerplate.
    #[inline]
    fn processing_with_context(
        kind: ProcessingStage,
        context: impl Into<String>,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            kind,
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Creates a FootprintError for processing operations.
    ///
    /// # Arguments
    ///
    /// * `kind` - The stage of processing where the error occurred.
    /// * `context` - Additional context about the error.
    /// * `error` - The underlying error that caused this error.
    pub fn processing_error(
        kind: ProcessingStage,
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::processing_with_context(kind, context, error)
    }

    /// Creates a FootprintError for a mutex that was poisoned by a panicking worker.
    pub fn lock_poisoned(kind: ProcessingStage, what: &str) -> Self {
        Self::processing_with_context(
            kind,
            format!("{what} lock poisoned"),
            SimpleError::new("a worker panicked while holding the lock"),
        )
    }

    /// Creates a FootprintError for inference operations.
    ///
    /// # Arguments
    ///
    /// * `adapter` - Name of the inference adapter.
    /// * `context` - Additional context about the failure.
    /// * `error` - The underlying error that caused this error.
    pub fn inference_error(
        adapter: &str,
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Inference {
            adapter: adapter.to_string(),
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Creates an inference error from a plain message.
    pub fn inference_message(adapter: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::Inference {
            adapter: adapter.to_string(),
            context: message.clone(),
            source: Box::new(SimpleError::new(message)),
        }
    }

    /// Creates a FootprintError for an inference call that exceeded its timeout.
    pub fn inference_timeout(adapter: &str, timeout: Duration) -> Self {
        Self::InferenceTimeout {
            adapter: adapter.to_string(),
            timeout,
        }
    }

    /// Creates a FootprintError for an invalid traced geometry.
    ///
    /// # Arguments
    ///
    /// * `component` - Discovery index of the connected component.
    /// * `message` - Description of the validity violation.
    pub fn geometry_error(component: usize, message: impl Into<String>) -> Self {
        Self::Geometry {
            component,
            message: message.into(),
        }
    }

    /// Creates a FootprintError for invalid input.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a FootprintError for configuration errors.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a FootprintError for configuration errors with context.
    ///
    /// # Arguments
    ///
    /// * `field` - The field where the error occurred.
    /// * `value` - The value of the field.
    /// * `reason` - The reason for the error.
    pub fn config_error_with_context(field: &str, value: &str, reason: &str) -> Self {
        Self::Configuration {
            message: format!(
                "Configuration error in field '{}' with value '{}': {}",
                field, value, reason
            ),
        }
    }

    /// Creates a FootprintError for a shape mismatch between two grids.
    ///
    /// # Arguments
    ///
    /// * `component` - The component that detected the mismatch.
    /// * `expected` - The expected (rows, cols) shape.
    /// * `actual` - The actual shape.
    pub fn shape_mismatch(component: &str, expected: (usize, usize), actual: &[usize]) -> Self {
        Self::InvalidInput {
            message: format!(
                "{}: expected shape [{}, {}], got {:?}",
                component, expected.0, expected.1, actual
            ),
        }
    }

    /// Creates a FootprintError for an IO failure with a description of what was accessed.
    pub fn io_error(context: &str, error: std::io::Error) -> Self {
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("{context}: {error}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ErrorKind;

    #[test]
    fn test_config_error_with_context_names_field() {
        let err = FootprintError::config_error_with_context("tile_size", "0", "must be positive");
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("tile_size"));
        assert!(err.to_string().contains("must be positive"));
    }

    #[test]
    fn test_inference_errors_are_retryable() {
        assert!(FootprintError::inference_message("stub", "boom").is_retryable());
        assert!(
            FootprintError::inference_timeout("stub", Duration::from_millis(5)).is_retryable()
        );
        assert!(!FootprintError::geometry_error(0, "bad").is_retryable());
        assert!(!FootprintError::Cancelled.is_retryable());
    }

    #[test]
    fn test_io_error_keeps_kind_and_context() {
        let err = FootprintError::io_error(
            "writing out.geojson",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.kind(), ErrorKind::Io);
        match err {
            FootprintError::Io(inner) => {
                assert_eq!(inner.kind(), std::io::ErrorKind::PermissionDenied);
                assert!(inner.to_string().contains("writing out.geojson"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_lock_poisoned_names_stage() {
        let err =
            FootprintError::lock_poisoned(ProcessingStage::Accumulation, "probability mosaic");
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(err.to_string().starts_with("mosaic accumulation failed"));
        assert!(err.to_string().contains("probability mosaic lock poisoned"));
    }

    #[test]
    fn test_shape_mismatch_reports_both_shapes() {
        let err = FootprintError::shape_mismatch("mosaic", (4, 5), &[4, 6]);
        let text = err.to_string();
        assert!(text.contains("[4, 5]"));
        assert!(text.contains("[4, 6]"));
    }
}
