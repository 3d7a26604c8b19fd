//! The raster input seam.

use crate::core::errors::FootprintError;
use crate::domain::raster::RasterSurface;
use crate::domain::window::Window;
use ndarray::Array3;
use std::fmt::Debug;

/// A georeferenced raster that can be read one window at a time.
///
/// Reads happen concurrently from the inference workers; implementations
/// must be `Sync` and must not mutate shared state without locking.
pub trait RasterSource: Send + Sync + Debug {
    /// Dimensions, band count, transform, CRS and nodata of the raster.
    fn surface(&self) -> &RasterSurface;

    /// Reads the pixels of a window as a `rows x cols x bands` array.
    ///
    /// Any error aborts the run as an IO failure.
    fn read_window(&self, window: &Window) -> Result<Array3<f32>, FootprintError>;
}
