//! Polygon post-processing: simplification, validity enforcement and area
//! filtering.
//!
//! The main struct [`PolygonPostProcessor`] turns the vectorizer's features
//! into the final feature collection. The process involves:
//! 1. Validating each traced polygon; invalid ones are rejected
//! 2. Simplifying every ring, falling back to the traced ring whenever the
//!    simplified geometry would be invalid
//! 3. Dropping polygons below the minimum area

use crate::core::config::PipelineConfig;
use crate::core::errors::FootprintError;
use crate::domain::feature::{FeatureCollection, PolygonFeature, Ring};
use crate::domain::raster::Crs;
use crate::processors::geometry::{simplify_ring, validate_polygon, validate_ring};
use tracing::{debug, warn};

/// Post-processor for traced building polygons.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolygonPostProcessor {
    /// Maximum deviation of a simplified ring from the traced one, in CRS units.
    ///
    /// Default: 0.0 (simplification disabled)
    pub simplify_tolerance: f64,

    /// Polygons with a smaller area (CRS units squared) are dropped.
    ///
    /// Default: 0.0
    pub min_polygon_area: f64,
}

/// Result of post-processing one batch of features.
#[derive(Debug)]
pub struct PostProcessOutput {
    /// Surviving features, in input order.
    pub collection: FeatureCollection,
    /// Components whose traced polygon was already invalid.
    pub rejected: Vec<(usize, FootprintError)>,
    /// Polygons dropped for being below the minimum area.
    pub filtered_small_polygons: usize,
    /// Features that kept some or all of their traced rings because the
    /// simplified version was invalid.
    pub simplification_fallbacks: usize,
}

impl PolygonPostProcessor {
    pub fn new(simplify_tolerance: f64, min_polygon_area: f64) -> Self {
        Self {
            simplify_tolerance,
            min_polygon_area,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.simplify_tolerance, config.min_polygon_area)
    }

    /// Validates and simplifies one feature.
    ///
    /// Returns the processed feature and whether a fallback to traced rings
    /// was needed.
    ///
    /// # Errors
    ///
    /// Returns a geometry error if the traced polygon is invalid.
    pub fn process_feature(
        &self,
        feature: &PolygonFeature,
    ) -> Result<(PolygonFeature, bool), FootprintError> {
        validate_polygon(feature)
            .map_err(|message| FootprintError::geometry_error(feature.component_id, message))?;

        if self.simplify_tolerance <= 0.0 {
            return Ok((feature.clone(), false));
        }

        let mut fallback = false;
        let mut simplify = |ring: &Ring, ccw: bool| {
            let simplified = simplify_ring(ring, self.simplify_tolerance);
            if validate_ring(&simplified).is_ok() {
                // simplification can flip a nearly degenerate ring
                simplified.oriented(ccw)
            } else {
                fallback = true;
                ring.clone()
            }
        };

        let exterior = simplify(&feature.exterior, true);
        let holes = feature.holes.iter().map(|h| simplify(h, false)).collect();
        let simplified = PolygonFeature::new(
            feature.component_id,
            exterior,
            holes,
            feature.crs.clone(),
        );

        match validate_polygon(&simplified) {
            Ok(()) => Ok((simplified, fallback)),
            Err(reason) => {
                debug!(
                    "component {}: simplified polygon invalid ({}), keeping traced geometry",
                    feature.component_id, reason
                );
                Ok((feature.clone(), true))
            }
        }
    }

    /// Processes every feature, preserving input order.
    pub fn process(&self, features: Vec<PolygonFeature>, crs: Crs) -> PostProcessOutput {
        let mut kept = Vec::with_capacity(features.len());
        let mut rejected = Vec::new();
        let mut filtered_small_polygons = 0;
        let mut simplification_fallbacks = 0;

        for feature in &features {
            match self.process_feature(feature) {
                Ok((processed, fallback)) => {
                    if fallback {
                        simplification_fallbacks += 1;
                    }
                    if processed.area() < self.min_polygon_area {
                        filtered_small_polygons += 1;
                    } else {
                        kept.push(processed);
                    }
                }
                Err(err) => {
                    warn!("dropping component {}: {}", feature.component_id, err);
                    rejected.push((feature.component_id, err));
                }
            }
        }

        debug!(
            "post-processing kept {} of {} polygons ({} below area, {} rejected, {} fallbacks)",
            kept.len(),
            features.len(),
            filtered_small_polygons,
            rejected.len(),
            simplification_fallbacks
        );

        PostProcessOutput {
            collection: FeatureCollection::new(crs, kept),
            rejected,
            filtered_small_polygons,
            simplification_fallbacks,
        }
    }
}

impl Default for PolygonPostProcessor {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}
