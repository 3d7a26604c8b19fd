//! Domain-level structures shared across the footprint pipeline.
//!
//! This module groups the georeferenced raster description, the window
//! descriptors produced by the planner, and the polygon features the
//! pipeline emits.

pub mod feature;
pub mod raster;
pub mod window;

pub use feature::{Coord, FeatureCollection, PolygonFeature, Ring};
pub use raster::{AffineTransform, Crs, InMemoryRaster, RasterSurface};
pub use window::{CoreRegion, Window};
