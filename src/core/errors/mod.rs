//! Error types for the footprint pipeline.
//!
//! Errors fall into the taxonomy reported by a run: configuration problems
//! are fatal before any processing starts, inference failures are retried and
//! then degrade to a skipped window, geometry failures drop a single
//! component, and IO failures abort the run.
//!
//! # Usage
//!
//! ```rust
//! use rooftrace::core::errors::{ErrorKind, FootprintError};
//!
//! let error = FootprintError::config_error("tile_size must exceed twice the overlap");
//! assert_eq!(error.kind(), ErrorKind::Configuration);
//!
//! let geometry = FootprintError::geometry_error(3, "exterior ring self-intersects");
//! assert_eq!(geometry.kind(), ErrorKind::Geometry);
//! ```

pub mod constructors;
pub mod types;

pub use types::{ErrorKind, FootprintError, ProcessingStage, SimpleError};

/// Convenient result alias for pipeline operations.
pub type FootprintResult<T> = Result<T, FootprintError>;
