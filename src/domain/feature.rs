//! Polygon features and the GeoJSON output they serialize to.

use crate::core::errors::FootprintError;
use crate::domain::raster::Crs;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// A 2D coordinate in pixel or CRS space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Coord {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// A closed ring stored without its repeated closing vertex.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ring {
    coords: Vec<Coord>,
}

impl Ring {
    pub fn new(coords: Vec<Coord>) -> Self {
        Self { coords }
    }

    pub fn coords(&self) -> &[Coord] {
        &self.coords
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Shoelace signed area; positive when counter-clockwise in a y-up plane.
    pub fn signed_area(&self) -> f64 {
        if self.coords.len() < 3 {
            return 0.0;
        }
        self.coords
            .iter()
            .circular_tuple_windows()
            .map(|(p, q)| p.x * q.y - q.x * p.y)
            .sum::<f64>()
            / 2.0
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    pub fn is_ccw(&self) -> bool {
        self.signed_area() > 0.0
    }

    /// The same ring traversed in the opposite direction.
    pub fn reversed(&self) -> Ring {
        let mut coords = self.coords.clone();
        coords.reverse();
        Ring { coords }
    }

    /// Returns this ring with the requested orientation.
    pub fn oriented(self, ccw: bool) -> Ring {
        if self.is_ccw() == ccw {
            self
        } else {
            self.reversed()
        }
    }

    /// Positions with the first vertex repeated at the end, as GeoJSON expects.
    pub fn closed_positions(&self) -> Vec<[f64; 2]> {
        self.coords
            .iter()
            .chain(self.coords.first())
            .map(|c| [c.x, c.y])
            .collect()
    }
}

/// One building footprint: an exterior ring plus optional holes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonFeature {
    /// Discovery index of the connected component that produced it.
    pub component_id: usize,
    pub exterior: Ring,
    pub holes: Vec<Ring>,
    pub crs: Crs,
}

impl PolygonFeature {
    pub fn new(component_id: usize, exterior: Ring, holes: Vec<Ring>, crs: Crs) -> Self {
        Self {
            component_id,
            exterior,
            holes,
            crs,
        }
    }

    /// Exterior area minus hole areas, in CRS units squared.
    pub fn area(&self) -> f64 {
        self.exterior.area() - self.holes.iter().map(Ring::area).sum::<f64>()
    }

    pub fn vertex_count(&self) -> usize {
        self.exterior.len() + self.holes.iter().map(Ring::len).sum::<usize>()
    }

    /// Exterior followed by holes.
    pub fn rings(&self) -> impl Iterator<Item = &Ring> {
        std::iter::once(&self.exterior).chain(self.holes.iter())
    }

    /// GeoJSON `Feature` object.
    pub fn to_geojson(&self) -> Value {
        let coordinates: Vec<Vec<[f64; 2]>> = self.rings().map(Ring::closed_positions).collect();
        json!({
            "type": "Feature",
            "geometry": {
                "type": "Polygon",
                "coordinates": coordinates,
            },
            "properties": {
                "component_id": self.component_id,
                "area": self.area(),
            },
        })
    }
}

/// Ordered polygon features sharing one CRS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    pub crs: Crs,
    pub features: Vec<PolygonFeature>,
}

impl FeatureCollection {
    pub fn new(crs: Crs, features: Vec<PolygonFeature>) -> Self {
        Self { crs, features }
    }

    pub fn empty(crs: Crs) -> Self {
        Self::new(crs, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PolygonFeature> {
        self.features.iter()
    }

    pub fn total_area(&self) -> f64 {
        self.features.iter().map(PolygonFeature::area).sum()
    }

    /// GeoJSON `FeatureCollection` with a named `crs` member.
    pub fn to_geojson(&self) -> Value {
        let features: Vec<Value> = self.features.iter().map(PolygonFeature::to_geojson).collect();
        json!({
            "type": "FeatureCollection",
            "crs": {
                "type": "name",
                "properties": { "name": self.crs.as_str() },
            },
            "features": features,
        })
    }

    pub fn to_geojson_string(&self) -> Result<String, FootprintError> {
        Ok(serde_json::to_string_pretty(&self.to_geojson())?)
    }

    /// Writes the collection as a GeoJSON file.
    ///
    /// # Errors
    ///
    /// Any failure to create or write the file is an IO error.
    pub fn write_geojson(&self, path: impl AsRef<Path>) -> Result<(), FootprintError> {
        let path = path.as_ref();
        let context = format!("writing {}", path.display());
        let file = File::create(path).map_err(|e| FootprintError::io_error(&context, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.to_geojson())?;
        writer
            .flush()
            .map_err(|e| FootprintError::io_error(&context, e))?;
        Ok(())
    }
}

impl<'a> IntoIterator for &'a FeatureCollection {
    type Item = &'a PolygonFeature;
    type IntoIter = std::slice::Iter<'a, PolygonFeature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}
