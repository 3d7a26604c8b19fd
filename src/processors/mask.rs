//! Thresholding and morphological cleanup of the reconciled surface.

use crate::core::config::PipelineConfig;
use crate::processors::mosaic::ProbabilityMosaic;
use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology;
use tracing::debug;

const FOREGROUND: u8 = 255;

/// Full-resolution building mask stored as a 0/255 grayscale image.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryMask {
    image: GrayImage,
}

impl BinaryMask {
    /// An all-background mask.
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            image: GrayImage::new(width as u32, height as u32),
        }
    }

    /// Builds a mask from a predicate over `(row, col)`.
    pub fn from_fn(height: usize, width: usize, f: impl Fn(usize, usize) -> bool) -> Self {
        let image = GrayImage::from_fn(width as u32, height as u32, |x, y| {
            Luma([if f(y as usize, x as usize) { FOREGROUND } else { 0 }])
        });
        Self { image }
    }

    /// Parses rows of `#` (foreground) and `.` (background).
    pub fn from_ascii(rows: &[&str]) -> Self {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.len());
        Self::from_fn(height, width, |row, col| {
            rows[row].as_bytes().get(col) == Some(&b'#')
        })
    }

    pub fn height(&self) -> usize {
        self.image.height() as usize
    }

    pub fn width(&self) -> usize {
        self.image.width() as usize
    }

    /// True for foreground; out-of-bounds reads are background.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> bool {
        row < self.height()
            && col < self.width()
            && self.image.get_pixel(col as u32, row as u32)[0] > 0
    }

    pub fn set(&mut self, row: usize, col: usize, value: bool) {
        self.image
            .put_pixel(col as u32, row as u32, Luma([if value { FOREGROUND } else { 0 }]));
    }

    pub fn foreground_count(&self) -> usize {
        self.image.pixels().filter(|p| p[0] > 0).count()
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.image
    }
}

/// Turns a reconciled mosaic into a cleaned binary mask.
///
/// Kernel size `s` is a square structuring element with side
/// `2 * (s / 2) + 1`; sizes of 0 or 1 disable the operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskBuilder {
    pub threshold: f32,
    pub opening_kernel_size: u32,
    pub closing_kernel_size: u32,
}

impl MaskBuilder {
    pub fn new(threshold: f32, opening_kernel_size: u32, closing_kernel_size: u32) -> Self {
        Self {
            threshold,
            opening_kernel_size,
            closing_kernel_size,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.threshold,
            config.opening_kernel_size,
            config.closing_kernel_size,
        )
    }

    /// Thresholds, opens, then closes the mosaic.
    ///
    /// Unclassified pixels are background before and after morphology.
    pub fn build(&self, mosaic: &ProbabilityMosaic) -> BinaryMask {
        let (height, width) = mosaic.shape();
        let mut mask = BinaryMask::from_fn(height, width, |row, col| {
            mosaic
                .reconciled(row, col)
                .is_some_and(|p| p > self.threshold)
        });
        let thresholded = mask.foreground_count();

        if let Some(radius) = kernel_radius(self.opening_kernel_size) {
            mask.image = morphology::open(&mask.image, Norm::LInf, radius);
        }
        if let Some(radius) = kernel_radius(self.closing_kernel_size) {
            mask.image = morphology::close(&mask.image, Norm::LInf, radius);
        }

        // closing may grow into uncovered footprints
        for ((row, col), &count) in mosaic.coverage_grid().indexed_iter() {
            if count == 0 {
                mask.set(row, col, false);
            }
        }

        debug!(
            "mask: {} foreground pixels after threshold, {} after morphology",
            thresholded,
            mask.foreground_count()
        );
        mask
    }
}

fn kernel_radius(size: u32) -> Option<u8> {
    if size <= 1 {
        None
    } else {
        u8::try_from(size / 2).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::window::Window;
    use ndarray::Array2;

    fn mosaic_from(probs: Array2<f32>) -> ProbabilityMosaic {
        let (h, w) = probs.dim();
        let mut mosaic = ProbabilityMosaic::new(h, w);
        mosaic
            .accumulate(&Window::new(0, 0, h, w, 1, (0, 0)), probs.view())
            .unwrap();
        mosaic
    }

    #[test]
    fn test_threshold_is_strict() {
        let probs = Array2::from_shape_vec((1, 3), vec![0.5, 0.51, 0.49]).unwrap();
        let mask = MaskBuilder::new(0.5, 0, 0).build(&mosaic_from(probs));
        assert!(!mask.get(0, 0));
        assert!(mask.get(0, 1));
        assert!(!mask.get(0, 2));
    }

    #[test]
    fn test_opening_removes_isolated_pixel() {
        let mut probs = Array2::<f32>::zeros((20, 20));
        probs[[3, 3]] = 0.9;
        for r in 10..16 {
            for c in 10..16 {
                probs[[r, c]] = 0.9;
            }
        }
        let mask = MaskBuilder::new(0.5, 3, 0).build(&mosaic_from(probs));
        assert!(!mask.get(3, 3));
        assert!(mask.get(12, 12));
        assert_eq!(mask.foreground_count(), 36);
    }

    #[test]
    fn test_closing_fills_small_gap() {
        let mut probs = Array2::<f32>::zeros((12, 12));
        for r in 2..10 {
            for c in 2..10 {
                probs[[r, c]] = 0.9;
            }
        }
        probs[[5, 5]] = 0.1;
        let mask = MaskBuilder::new(0.5, 0, 3).build(&mosaic_from(probs));
        assert!(mask.get(5, 5));
        assert_eq!(mask.foreground_count(), 64);
    }

    #[test]
    fn test_disabled_kernels_keep_threshold_result() {
        let mut probs = Array2::<f32>::zeros((5, 5));
        probs[[2, 2]] = 0.9;
        let mask = MaskBuilder::new(0.5, 1, 0).build(&mosaic_from(probs));
        assert_eq!(mask.foreground_count(), 1);
    }

    #[test]
    fn test_unclassified_pixels_stay_background_after_closing() {
        let mut mosaic = ProbabilityMosaic::new(10, 10);
        let covered = Window::new(0, 0, 10, 6, 1, (0, 0));
        mosaic
            .accumulate(&covered, Array2::from_elem((10, 6), 0.9).view())
            .unwrap();
        let covered = Window::new(0, 7, 10, 3, 1, (0, 1));
        mosaic
            .accumulate(&covered, Array2::from_elem((10, 3), 0.9).view())
            .unwrap();

        let mask = MaskBuilder::new(0.5, 0, 5).build(&mosaic);
        for row in 0..10 {
            assert!(!mask.get(row, 6));
        }
        assert!(mask.get(5, 5));
    }

    #[test]
    fn test_ascii_masks_parse() {
        let mask = BinaryMask::from_ascii(&["#.", ".#"]);
        assert!(mask.get(0, 0));
        assert!(!mask.get(0, 1));
        assert!(mask.get(1, 1));
        assert!(!mask.get(5, 5));
    }
}
