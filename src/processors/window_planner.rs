//! Deterministic grid of overlapping windows over a raster.
//!
//! Windows sit on a stride of `tile_size - 2 * overlap_margin` starting at the
//! origin. Neighbouring windows therefore share `2 * overlap_margin` pixels,
//! and the boundary between their core regions falls in the middle of that
//! shared band. The last window on each axis is clipped to the raster and may
//! be smaller than the tile.

use crate::core::errors::FootprintError;
use crate::domain::window::{CoreRegion, Window};
use std::iter::FusedIterator;

/// Window placement along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AxisPlan {
    extent: usize,
    tile: usize,
    margin: usize,
    stride: usize,
    count: usize,
}

impl AxisPlan {
    fn new(extent: usize, tile: usize, margin: usize) -> Self {
        let stride = tile - 2 * margin;
        let count = 1 + extent.saturating_sub(tile).div_ceil(stride);
        Self {
            extent,
            tile,
            margin,
            stride,
            count,
        }
    }

    fn origin(&self, index: usize) -> usize {
        index * self.stride
    }

    fn length(&self, index: usize) -> usize {
        self.tile.min(self.extent - self.origin(index))
    }

    /// Half-open core span of the window at `index`.
    fn core(&self, index: usize) -> (usize, usize) {
        let start = if index == 0 {
            0
        } else {
            self.origin(index) + self.margin
        };
        let end = if index + 1 == self.count {
            self.extent
        } else {
            self.origin(index + 1) + self.margin
        };
        (start, end)
    }
}

/// Plans the windows covering a `height x width` raster.
///
/// ```rust
/// use rooftrace::processors::WindowPlanner;
///
/// let planner = WindowPlanner::new(512, 512, 256, 32)?;
/// assert_eq!(planner.grid_shape(), (3, 3));
/// let last = planner.windows().last().unwrap();
/// assert_eq!((last.row_offset, last.height), (384, 128));
/// # Ok::<(), rooftrace::core::FootprintError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPlanner {
    rows: AxisPlan,
    cols: AxisPlan,
}

impl WindowPlanner {
    /// Creates a planner.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the raster is empty, when the tile
    /// size or margin is zero, or when `tile_size <= 2 * overlap_margin`.
    pub fn new(
        height: usize,
        width: usize,
        tile_size: usize,
        overlap_margin: usize,
    ) -> Result<Self, FootprintError> {
        if height == 0 || width == 0 {
            return Err(FootprintError::config_error_with_context(
                "raster",
                &format!("{height}x{width}"),
                "raster must not be empty",
            ));
        }
        if tile_size == 0 || overlap_margin == 0 {
            return Err(FootprintError::config_error_with_context(
                "tile_size/overlap_margin",
                &format!("{tile_size}/{overlap_margin}"),
                "both must be positive",
            ));
        }
        if tile_size <= overlap_margin.saturating_mul(2) {
            return Err(FootprintError::config_error_with_context(
                "tile_size",
                &tile_size.to_string(),
                &format!("must exceed twice the overlap margin {overlap_margin}"),
            ));
        }

        Ok(Self {
            rows: AxisPlan::new(height, tile_size, overlap_margin),
            cols: AxisPlan::new(width, tile_size, overlap_margin),
        })
    }

    /// `(grid_rows, grid_cols)` of the window grid.
    pub fn grid_shape(&self) -> (usize, usize) {
        (self.rows.count, self.cols.count)
    }

    /// Total number of windows.
    pub fn len(&self) -> usize {
        self.rows.count * self.cols.count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Distance between consecutive window origins.
    pub fn stride(&self) -> usize {
        self.rows.stride
    }

    /// A fresh row-major iterator over every window.
    ///
    /// Each call starts over; windows are computed on demand.
    pub fn windows(&self) -> Windows {
        Windows {
            planner: *self,
            next: 0,
            end: self.len(),
        }
    }

    /// The window at a grid position.
    pub fn window(&self, grid_row: usize, grid_col: usize) -> Option<Window> {
        if grid_row >= self.rows.count || grid_col >= self.cols.count {
            return None;
        }

        let (row_start, row_end) = self.rows.core(grid_row);
        let (col_start, col_end) = self.cols.core(grid_col);
        let window = Window::new(
            self.rows.origin(grid_row),
            self.cols.origin(grid_col),
            self.rows.length(grid_row),
            self.cols.length(grid_col),
            self.rows.margin,
            (grid_row, grid_col),
        )
        .with_core(CoreRegion {
            row_start,
            row_end,
            col_start,
            col_end,
        });
        Some(window)
    }
}

/// Lazy iterator over a planner's windows in row-major order.
#[derive(Debug, Clone)]
pub struct Windows {
    planner: WindowPlanner,
    next: usize,
    end: usize,
}

impl Iterator for Windows {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        if self.next >= self.end {
            return None;
        }
        let index = self.next;
        self.next += 1;
        let cols = self.planner.cols.count;
        self.planner.window(index / cols, index % cols)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Windows {}

impl FusedIterator for Windows {}
