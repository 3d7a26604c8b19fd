//! Input validation utilities.
//!
//! Small checks shared by the raster, mosaic and inference layers so that
//! malformed inputs surface as [`FootprintError::InvalidInput`] instead of
//! panics deep inside array indexing.

use crate::core::errors::FootprintError;
use ndarray::{ArrayView2, ArrayView3};

/// Validates that a float value is finite (not NaN or infinite).
#[inline]
pub fn validate_finite(value: f64, param_name: &str) -> Result<(), FootprintError> {
    if !value.is_finite() {
        return Err(FootprintError::InvalidInput {
            message: format!("Parameter '{}' must be finite, got: {}", param_name, value),
        });
    }
    Ok(())
}

/// Validates raster dimensions.
pub fn validate_raster_dimensions(
    height: usize,
    width: usize,
    bands: usize,
    context: &str,
) -> Result<(), FootprintError> {
    if height == 0 || width == 0 || bands == 0 {
        return Err(FootprintError::InvalidInput {
            message: format!(
                "{}: raster dimensions must be positive, got {}x{}x{}",
                context, height, width, bands
            ),
        });
    }

    // Keeps per-pixel indices within u32 label space
    const MAX_DIMENSION: usize = 1 << 16;
    if height > MAX_DIMENSION || width > MAX_DIMENSION {
        return Err(FootprintError::InvalidInput {
            message: format!(
                "{}: raster dimensions exceed maximum of {}x{}, got {}x{}",
                context, MAX_DIMENSION, MAX_DIMENSION, height, width
            ),
        });
    }

    Ok(())
}

/// Validates that a probability grid has the expected (rows, cols) shape.
pub fn validate_grid_shape(
    grid: ArrayView2<'_, f32>,
    expected: (usize, usize),
    component: &str,
) -> Result<(), FootprintError> {
    if grid.dim() != expected {
        return Err(FootprintError::shape_mismatch(
            component,
            expected,
            grid.shape(),
        ));
    }
    Ok(())
}

/// Validates that every value of a probability grid is finite and in [0, 1].
///
/// Returns the first offending `(row, col, value)` in the error message.
pub fn validate_probabilities(
    grid: ArrayView2<'_, f32>,
    component: &str,
) -> Result<(), FootprintError> {
    if let Some(((row, col), value)) = grid
        .indexed_iter()
        .find(|(_, v)| !v.is_finite() || !(0.0..=1.0).contains(*v))
    {
        return Err(FootprintError::InvalidInput {
            message: format!(
                "{}: probability at ({}, {}) must be finite and in [0, 1], got {}",
                component, row, col, value
            ),
        });
    }
    Ok(())
}

/// Validates that a window tile is `rows x cols x bands`.
pub fn validate_tile_shape(
    tile: ArrayView3<'_, f32>,
    rows: usize,
    cols: usize,
    bands: usize,
) -> Result<(), FootprintError> {
    let (h, w, c) = tile.dim();
    if h != rows || w != cols || c != bands {
        return Err(FootprintError::InvalidInput {
            message: format!(
                "tile expected shape [{}, {}, {}], got [{}, {}, {}]",
                rows, cols, bands, h, w, c
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};

    #[test]
    fn test_validate_finite() {
        assert!(validate_finite(1.0, "test").is_ok());
        assert!(validate_finite(-1.0, "test").is_ok());
        assert!(validate_finite(f64::NAN, "test").is_err());
        assert!(validate_finite(f64::INFINITY, "test").is_err());
    }

    #[test]
    fn test_validate_raster_dimensions() {
        assert!(validate_raster_dimensions(10, 10, 3, "test").is_ok());
        assert!(validate_raster_dimensions(0, 10, 3, "test").is_err());
        assert!(validate_raster_dimensions(10, 10, 0, "test").is_err());
        assert!(validate_raster_dimensions(70_000, 10, 1, "test").is_err());
    }

    #[test]
    fn test_validate_grid_shape() {
        let grid = Array2::<f32>::zeros((4, 5));
        assert!(validate_grid_shape(grid.view(), (4, 5), "test").is_ok());
        assert!(validate_grid_shape(grid.view(), (5, 4), "test").is_err());
    }

    #[test]
    fn test_validate_probabilities() {
        let mut grid = Array2::<f32>::from_elem((3, 3), 0.5);
        assert!(validate_probabilities(grid.view(), "test").is_ok());
        grid[[1, 2]] = f32::NAN;
        let err = validate_probabilities(grid.view(), "test").unwrap_err();
        assert!(err.to_string().contains("(1, 2)"));
        grid[[1, 2]] = 1.5;
        assert!(validate_probabilities(grid.view(), "test").is_err());
    }

    #[test]
    fn test_validate_tile_shape() {
        let tile = Array3::<f32>::zeros((2, 3, 4));
        assert!(validate_tile_shape(tile.view(), 2, 3, 4).is_ok());
        assert!(validate_tile_shape(tile.view(), 3, 2, 4).is_err());
    }
}
