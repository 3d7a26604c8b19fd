//! Traits at the seams of the footprint pipeline.
//!
//! - [`InferenceAdapter`]: the external model, called once per window
//! - [`RasterSource`]: the georeferenced input, read one window at a time

pub mod adapter;
pub mod source;

pub use adapter::InferenceAdapter;
pub use source::RasterSource;
