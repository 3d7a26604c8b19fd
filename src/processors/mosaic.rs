//! Reconciliation of overlapping window predictions into one surface.

use crate::core::errors::FootprintError;
use crate::core::validation::validate_grid_shape;
use crate::domain::window::Window;
use ndarray::{Array2, ArrayView2, Zip, s};

/// Running sum of window probabilities plus a per-pixel coverage count.
///
/// The reconciled probability of a pixel is the arithmetic mean of every
/// window that covered it. Pixels no window covered are *unclassified*.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityMosaic {
    accumulated: Array2<f32>,
    coverage: Array2<u32>,
}

impl ProbabilityMosaic {
    /// Creates an empty mosaic of `height x width` pixels.
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            accumulated: Array2::zeros((height, width)),
            coverage: Array2::zeros((height, width)),
        }
    }

    /// `(rows, cols)` of the mosaic.
    pub fn shape(&self) -> (usize, usize) {
        self.accumulated.dim()
    }

    /// Adds a window's probabilities over its full footprint.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `probs` does not match the window's shape or
    /// the window extends past the mosaic.
    pub fn accumulate(
        &mut self,
        window: &Window,
        probs: ArrayView2<'_, f32>,
    ) -> Result<(), FootprintError> {
        validate_grid_shape(probs, window.shape(), "probability mosaic")?;
        let (height, width) = self.shape();
        if window.row_end() > height || window.col_end() > width {
            return Err(FootprintError::invalid_input(format!(
                "window {window} extends past the {height}x{width} mosaic"
            )));
        }

        let rows = window.row_offset..window.row_end();
        let cols = window.col_offset..window.col_end();
        Zip::from(self.accumulated.slice_mut(s![rows.clone(), cols.clone()]))
            .and(self.coverage.slice_mut(s![rows, cols]))
            .and(probs)
            .for_each(|sum, count, &p| {
                *sum += p;
                *count += 1;
            });
        Ok(())
    }

    /// Adds another mosaic of the same shape into this one.
    pub fn merge(&mut self, other: &ProbabilityMosaic) -> Result<(), FootprintError> {
        if other.shape() != self.shape() {
            let (rows, cols) = other.shape();
            return Err(FootprintError::shape_mismatch(
                "probability mosaic merge",
                self.shape(),
                &[rows, cols],
            ));
        }
        self.accumulated += &other.accumulated;
        self.coverage += &other.coverage;
        Ok(())
    }

    /// Mean probability at a pixel, or `None` if it is unclassified or out of bounds.
    pub fn reconciled(&self, row: usize, col: usize) -> Option<f32> {
        match self.coverage.get((row, col)) {
            Some(&count) if count > 0 => Some(self.accumulated[[row, col]] / count as f32),
            _ => None,
        }
    }

    /// Number of windows that covered a pixel.
    pub fn coverage(&self, row: usize, col: usize) -> u32 {
        self.coverage.get((row, col)).copied().unwrap_or(0)
    }

    pub fn coverage_grid(&self) -> ArrayView2<'_, u32> {
        self.coverage.view()
    }

    pub fn is_unclassified(&self, row: usize, col: usize) -> bool {
        self.coverage(row, col) == 0
    }

    /// Number of pixels no window covered.
    pub fn unclassified_count(&self) -> usize {
        self.coverage.iter().filter(|&&c| c == 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ErrorKind;
    use crate::processors::WindowPlanner;

    #[test]
    fn test_overlapping_windows_average() {
        let mut mosaic = ProbabilityMosaic::new(4, 6);
        let left = Window::new(0, 0, 4, 4, 1, (0, 0));
        let right = Window::new(0, 2, 4, 4, 1, (0, 1));
        mosaic
            .accumulate(&left, Array2::from_elem((4, 4), 0.2).view())
            .unwrap();
        mosaic
            .accumulate(&right, Array2::from_elem((4, 4), 0.8).view())
            .unwrap();

        assert_eq!(mosaic.reconciled(1, 0), Some(0.2));
        assert!((mosaic.reconciled(1, 2).unwrap() - 0.5).abs() < 1e-6);
        assert!((mosaic.reconciled(1, 3).unwrap() - 0.5).abs() < 1e-6);
        assert_eq!(mosaic.reconciled(1, 5), Some(0.8));
        assert_eq!(mosaic.coverage(0, 3), 2);
        assert_eq!(mosaic.unclassified_count(), 0);
    }

    #[test]
    fn test_planned_windows_cover_every_pixel() {
        let planner = WindowPlanner::new(300, 517, 128, 16).unwrap();
        let mut mosaic = ProbabilityMosaic::new(300, 517);
        for window in planner.windows() {
            let probs = Array2::from_elem(window.shape(), 0.25);
            mosaic.accumulate(&window, probs.view()).unwrap();
        }
        assert!(mosaic.coverage_grid().iter().all(|&c| c >= 1));
        assert_eq!(mosaic.reconciled(299, 516), Some(0.25));
    }

    #[test]
    fn test_uncovered_pixels_are_unclassified() {
        let mut mosaic = ProbabilityMosaic::new(3, 3);
        let window = Window::new(0, 0, 2, 2, 1, (0, 0));
        mosaic
            .accumulate(&window, Array2::from_elem((2, 2), 1.0).view())
            .unwrap();
        assert_eq!(mosaic.unclassified_count(), 5);
        assert!(mosaic.is_unclassified(2, 2));
        assert_eq!(mosaic.reconciled(2, 2), None);
        assert_eq!(mosaic.reconciled(10, 10), None);
    }

    #[test]
    fn test_rejects_mismatched_shapes() {
        let mut mosaic = ProbabilityMosaic::new(4, 4);
        let window = Window::new(0, 0, 2, 2, 1, (0, 0));
        let err = mosaic
            .accumulate(&window, Array2::zeros((2, 3)).view())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);

        let outside = Window::new(3, 3, 2, 2, 1, (1, 1));
        assert!(mosaic.accumulate(&outside, Array2::zeros((2, 2)).view()).is_err());
        assert!(mosaic.merge(&ProbabilityMosaic::new(4, 5)).is_err());
    }

    #[test]
    fn test_merging_partials_matches_direct_accumulation() {
        let windows = [
            Window::new(0, 0, 3, 3, 1, (0, 0)),
            Window::new(0, 1, 3, 3, 1, (0, 1)),
        ];
        let mut direct = ProbabilityMosaic::new(3, 4);
        let mut first = ProbabilityMosaic::new(3, 4);
        let mut second = ProbabilityMosaic::new(3, 4);
        let a = Array2::from_elem((3, 3), 0.3);
        let b = Array2::from_elem((3, 3), 0.9);

        direct.accumulate(&windows[0], a.view()).unwrap();
        direct.accumulate(&windows[1], b.view()).unwrap();
        first.accumulate(&windows[0], a.view()).unwrap();
        second.accumulate(&windows[1], b.view()).unwrap();
        first.merge(&second).unwrap();

        assert_eq!(first, direct);
    }
}
