//! Window descriptors produced by the window planner.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open pixel rectangle `[row_start, row_end) x [col_start, col_end)`
/// owned exclusively by one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoreRegion {
    pub row_start: usize,
    pub row_end: usize,
    pub col_start: usize,
    pub col_end: usize,
}

impl CoreRegion {
    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.row_start..self.row_end).contains(&row)
            && (self.col_start..self.col_end).contains(&col)
    }

    pub fn pixel_count(&self) -> usize {
        (self.row_end - self.row_start) * (self.col_end - self.col_start)
    }
}

/// One rectangular pixel window of the raster.
///
/// The footprint `[row_offset, row_offset + height) x [col_offset, col_offset + width)`
/// is what the adapter sees; the [`CoreRegion`] is the part of it no other
/// window owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Window {
    pub row_offset: usize,
    pub col_offset: usize,
    pub height: usize,
    pub width: usize,
    pub overlap_margin: usize,
    /// `(grid_row, grid_col)` position in the planner's grid.
    pub grid_index: (usize, usize),
    pub core: CoreRegion,
}

impl Window {
    /// Creates a window whose core region is its whole footprint.
    pub fn new(
        row_offset: usize,
        col_offset: usize,
        height: usize,
        width: usize,
        overlap_margin: usize,
        grid_index: (usize, usize),
    ) -> Self {
        Self {
            row_offset,
            col_offset,
            height,
            width,
            overlap_margin,
            grid_index,
            core: CoreRegion {
                row_start: row_offset,
                row_end: row_offset + height,
                col_start: col_offset,
                col_end: col_offset + width,
            },
        }
    }

    /// Replaces the core region.
    pub fn with_core(mut self, core: CoreRegion) -> Self {
        self.core = core;
        self
    }

    /// Exclusive end row of the footprint.
    pub fn row_end(&self) -> usize {
        self.row_offset + self.height
    }

    /// Exclusive end column of the footprint.
    pub fn col_end(&self) -> usize {
        self.col_offset + self.width
    }

    /// `(rows, cols)` of the footprint.
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn pixel_count(&self) -> usize {
        self.height * self.width
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.row_offset..self.row_end()).contains(&row)
            && (self.col_offset..self.col_end()).contains(&col)
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}) rows {}..{} cols {}..{}",
            self.grid_index.0,
            self.grid_index.1,
            self.row_offset,
            self.row_end(),
            self.col_offset,
            self.col_end()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_footprint_bounds_are_half_open() {
        let window = Window::new(10, 20, 5, 8, 2, (1, 2));
        assert_eq!(window.row_end(), 15);
        assert_eq!(window.col_end(), 28);
        assert!(window.contains(14, 27));
        assert!(!window.contains(15, 27));
        assert_eq!(window.core.pixel_count(), 40);
        assert_eq!(window.to_string(), "(1, 2) rows 10..15 cols 20..28");
    }
}
