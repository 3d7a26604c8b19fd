//! The inference adapter seam.

use crate::core::errors::FootprintError;
use ndarray::{Array2, ArrayView3};
use std::fmt::Debug;

/// A building-segmentation model that turns one window into per-pixel
/// building probabilities.
///
/// Implementations are shared across worker threads, so they must be
/// `Send + Sync`. The pipeline treats the adapter as opaque: it only relies
/// on the output contract below and retries calls that return an error.
///
/// # Contract
///
/// Given a tile of shape `rows x cols x bands` (row-major, band-last), the
/// adapter returns a `rows x cols` grid whose values are finite and within
/// `[0, 1]`. Outputs that break the contract are treated as failures.
///
/// ```rust
/// use ndarray::{Array2, ArrayView3, Axis};
/// use rooftrace::core::{FootprintError, InferenceAdapter};
///
/// #[derive(Debug)]
/// struct FirstBand;
///
/// impl InferenceAdapter for FirstBand {
///     fn predict(&self, tile: ArrayView3<'_, f32>) -> Result<Array2<f32>, FootprintError> {
///         Ok(tile.index_axis(Axis(2), 0).mapv(|v| v.clamp(0.0, 1.0)))
///     }
///
///     fn name(&self) -> &str {
///         "first-band"
///     }
/// }
/// ```
pub trait InferenceAdapter: Send + Sync + Debug {
    /// Predicts building probabilities for one window tile.
    fn predict(&self, tile: ArrayView3<'_, f32>) -> Result<Array2<f32>, FootprintError>;

    /// Name of the adapter, used in logs and error messages.
    fn name(&self) -> &str;
}
