//! Raster-to-vector conversion of the binary mask.
//!
//! Foreground pixels are grouped into 8-connected components. Each component
//! is traced along pixel edges (crack following) so that every boundary edge
//! keeps foreground on its right-hand side in pixel space. At a saddle
//! vertex, where two diagonal pixels are foreground and the other two are
//! background, the trace turns left; this keeps diagonal neighbours in one
//! ring. Each pass through a saddle is nudged by [`SADDLE_OFFSET`] toward the
//! background pixel it wraps around, so rings never touch themselves or each
//! other.
//!
//! Ring vertices are pixel corners. In pixel-index space, where pixel
//! `(col, row)` is centred on `(col, row)`, a corner lies on half-integer
//! coordinates and is mapped with
//! [`AffineTransform::pixel_center_to_geo`](crate::domain::AffineTransform::pixel_center_to_geo).

use crate::core::errors::FootprintError;
use crate::domain::feature::{Coord, PolygonFeature, Ring};
use crate::domain::raster::RasterSurface;
use crate::processors::mask::BinaryMask;
use ndarray::Array2;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Displacement of saddle vertices, in pixels along each axis.
pub const SADDLE_OFFSET: f64 = 0.01;

/// One 8-connected foreground component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentInfo {
    /// Discovery index in row-major scan order.
    pub id: usize,
    pub pixel_count: usize,
    pub min_row: usize,
    pub max_row: usize,
    pub min_col: usize,
    pub max_col: usize,
}

impl ComponentInfo {
    /// Label value of this component in [`ComponentLabels::labels`].
    pub fn label(&self) -> u32 {
        self.id as u32 + 1
    }
}

/// Label grid (0 = background, `id + 1` = component) and component summaries.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentLabels {
    pub labels: Array2<u32>,
    pub components: Vec<ComponentInfo>,
}

/// Labels the 8-connected foreground components of a mask in row-major
/// discovery order.
pub fn label_components(mask: &BinaryMask) -> ComponentLabels {
    let (height, width) = (mask.height(), mask.width());
    let mut labels = Array2::<u32>::zeros((height, width));
    let mut components = Vec::new();
    let mut queue = VecDeque::new();

    for row in 0..height {
        for col in 0..width {
            if labels[[row, col]] != 0 || !mask.get(row, col) {
                continue;
            }

            let mut info = ComponentInfo {
                id: components.len(),
                pixel_count: 0,
                min_row: row,
                max_row: row,
                min_col: col,
                max_col: col,
            };
            let label = info.label();
            labels[[row, col]] = label;
            queue.push_back((row, col));

            while let Some((r, c)) = queue.pop_front() {
                info.pixel_count += 1;
                info.min_row = info.min_row.min(r);
                info.max_row = info.max_row.max(r);
                info.min_col = info.min_col.min(c);
                info.max_col = info.max_col.max(c);

                for nr in r.saturating_sub(1)..=(r + 1).min(height - 1) {
                    for nc in c.saturating_sub(1)..=(c + 1).min(width - 1) {
                        if labels[[nr, nc]] == 0 && mask.get(nr, nc) {
                            labels[[nr, nc]] = label;
                            queue.push_back((nr, nc));
                        }
                    }
                }
            }

            components.push(info);
        }
    }

    ComponentLabels { labels, components }
}

/// Result of vectorizing one mask.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VectorizeOutput {
    /// One feature per qualifying component, in discovery order.
    pub features: Vec<PolygonFeature>,
    /// Components below the pixel minimum, dropped before tracing.
    pub dropped_small_components: usize,
    /// Components whose boundary could not be assembled into a polygon.
    pub rejected: Vec<(usize, String)>,
}

/// Traces mask components into georeferenced polygons.
///
/// Away from saddles the rings follow pixel edges exactly. Each pass through
/// a saddle moves one ring vertex by [`SADDLE_OFFSET`] along both axes, so no
/// vertex is more than `SADDLE_OFFSET * sqrt(2)` pixels off the lattice. One
/// pass changes the ring area by `SADDLE_OFFSET * (a + b) / 2` square pixels,
/// where `a` and `b` are the lengths of the two straight edge runs meeting at
/// the vertex. A lone diagonal contact (`a = b = 1`) is passed twice and adds
/// `2 * SADDLE_OFFSET`. The traced area thus differs from the pixel count by
/// at most the sum of these terms over all saddle passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vectorizer {
    pub min_component_pixels: usize,
}

impl Vectorizer {
    pub fn new(min_component_pixels: usize) -> Self {
        Self {
            min_component_pixels,
        }
    }

    /// Vectorizes every qualifying component of `mask`.
    ///
    /// The output is a pure function of the mask and surface.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the mask and surface shapes differ.
    pub fn vectorize(
        &self,
        mask: &BinaryMask,
        surface: &RasterSurface,
    ) -> Result<VectorizeOutput, FootprintError> {
        if (mask.height(), mask.width()) != surface.shape() {
            return Err(FootprintError::shape_mismatch(
                "vectorizer mask",
                surface.shape(),
                &[mask.height(), mask.width()],
            ));
        }

        let ComponentLabels { labels, components } = label_components(mask);
        let mut output = VectorizeOutput::default();

        for component in &components {
            if component.pixel_count < self.min_component_pixels {
                output.dropped_small_components += 1;
                continue;
            }

            let tracer = ComponentTracer::new(&labels, component);
            match tracer.trace().and_then(|rings| tracer.assemble(rings)) {
                Ok((exterior, holes)) => {
                    output
                        .features
                        .push(to_feature(component.id, exterior, holes, surface));
                }
                Err(message) => {
                    warn!("component {} could not be traced: {}", component.id, message);
                    output.rejected.push((component.id, message));
                }
            }
        }

        debug!(
            "vectorized {} of {} components ({} below {} pixels)",
            output.features.len(),
            components.len(),
            output.dropped_small_components,
            self.min_component_pixels
        );
        Ok(output)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dir {
    East,
    South,
    West,
    North,
}

impl Dir {
    const ALL: [Dir; 4] = [Dir::East, Dir::South, Dir::West, Dir::North];

    /// Unit step in pixel space (y grows downward).
    fn delta(self) -> (i64, i64) {
        match self {
            Dir::East => (1, 0),
            Dir::South => (0, 1),
            Dir::West => (-1, 0),
            Dir::North => (0, -1),
        }
    }

    fn turn_left(self) -> Dir {
        match self {
            Dir::East => Dir::North,
            Dir::South => Dir::East,
            Dir::West => Dir::South,
            Dir::North => Dir::West,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// A ring corner in local lattice coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Corner {
    x: i64,
    y: i64,
    offset: (f64, f64),
}

#[derive(Debug, Clone, PartialEq)]
struct TracedRing {
    corners: Vec<Corner>,
    /// Twice the signed lattice area; positive for exteriors.
    twice_area: i64,
}

/// Tracing context for one component, restricted to its bounding box padded
/// by one pixel on every side.
///
/// Lattice vertex `(x, y)` is the top-left corner of local pixel `(x, y)`.
struct ComponentTracer<'a> {
    labels: &'a Array2<u32>,
    label: u32,
    row0: i64,
    col0: i64,
    width: i64,
    height: i64,
}

impl<'a> ComponentTracer<'a> {
    fn new(labels: &'a Array2<u32>, component: &ComponentInfo) -> Self {
        Self {
            labels,
            label: component.label(),
            row0: component.min_row as i64 - 1,
            col0: component.min_col as i64 - 1,
            width: (component.max_col - component.min_col + 3) as i64,
            height: (component.max_row - component.min_row + 3) as i64,
        }
    }

    #[inline]
    fn fg(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return false;
        }
        let (row, col) = (self.row0 + y, self.col0 + x);
        if row < 0 || col < 0 {
            return false;
        }
        self.labels.get((row as usize, col as usize)) == Some(&self.label)
    }

    /// Whether the boundary edge leaving vertex `(x, y)` in `dir` exists.
    fn edge(&self, x: i64, y: i64, dir: Dir) -> bool {
        match dir {
            Dir::East => self.fg(x, y) && !self.fg(x, y - 1),
            Dir::South => self.fg(x - 1, y) && !self.fg(x, y),
            Dir::West => self.fg(x - 1, y - 1) && !self.fg(x - 1, y),
            Dir::North => self.fg(x, y - 1) && !self.fg(x - 1, y - 1),
        }
    }

    fn visit_index(&self, x: i64, y: i64, dir: Dir) -> usize {
        ((y * (self.width + 1) + x) as usize) * 4 + dir.index()
    }

    /// Traces every ring of the component, in row-major order of their first
    /// eastward edge.
    fn trace(&self) -> Result<Vec<TracedRing>, String> {
        let mut visited = vec![false; ((self.width + 1) * (self.height + 1) * 4) as usize];
        let mut rings = Vec::new();

        for y in 0..=self.height {
            for x in 0..=self.width {
                if self.edge(x, y, Dir::East) && !visited[self.visit_index(x, y, Dir::East)] {
                    rings.push(self.trace_ring((x, y), &mut visited)?);
                }
            }
        }
        Ok(rings)
    }

    fn trace_ring(&self, start: (i64, i64), visited: &mut [bool]) -> Result<TracedRing, String> {
        let max_steps = visited.len();
        let (mut x, mut y) = start;
        let mut dir = Dir::East;
        let mut corners = Vec::new();
        let mut twice_area = 0i64;

        for _ in 0..max_steps {
            visited[self.visit_index(x, y, dir)] = true;
            let (dx, dy) = dir.delta();
            let (nx, ny) = (x + dx, y + dy);
            twice_area += x * ny - nx * y;
            (x, y) = (nx, ny);

            let mut outgoing = Dir::ALL.into_iter().filter(|&d| self.edge(x, y, d));
            let (next, saddle) = match (outgoing.next(), outgoing.next()) {
                (Some(only), None) => (only, false),
                (Some(_), Some(_)) => (dir.turn_left(), true),
                _ => return Err(format!("boundary dead-ends at lattice vertex ({x}, {y})")),
            };

            if next != dir {
                let offset = if saddle {
                    let (ox, oy) = next.delta();
                    (
                        SADDLE_OFFSET * (ox - dx) as f64,
                        SADDLE_OFFSET * (oy - dy) as f64,
                    )
                } else {
                    (0.0, 0.0)
                };
                corners.push(Corner { x, y, offset });
            }
            dir = next;

            if (x, y) == start && dir == Dir::East {
                return Ok(TracedRing {
                    corners,
                    twice_area,
                });
            }
        }

        Err(format!("ring starting at {start:?} does not close"))
    }

    fn to_global(&self, corner: &Corner) -> (f64, f64) {
        (
            (self.col0 + corner.x) as f64 + corner.offset.0,
            (self.row0 + corner.y) as f64 + corner.offset.1,
        )
    }

    /// Splits traced rings into the outer boundary and its holes, in global
    /// lattice coordinates.
    fn assemble(&self, rings: Vec<TracedRing>) -> Result<PixelRings, String> {
        let mut exterior = None;
        let mut holes = Vec::new();
        for ring in rings {
            let points: Vec<(f64, f64)> = ring.corners.iter().map(|c| self.to_global(c)).collect();
            match ring.twice_area.signum() {
                1 => {
                    if exterior.replace(points).is_some() {
                        return Err("component has more than one outer boundary".to_string());
                    }
                }
                -1 => holes.push(points),
                _ => return Err("traced ring has zero area".to_string()),
            }
        }
        exterior
            .map(|ext| (ext, holes))
            .ok_or_else(|| "component has no outer boundary".to_string())
    }
}

type PixelRings = (Vec<(f64, f64)>, Vec<Vec<(f64, f64)>>);

/// Maps lattice rings to the CRS plane and orients them: exterior
/// counter-clockwise, holes clockwise.
fn to_feature(
    component_id: usize,
    exterior: Vec<(f64, f64)>,
    holes: Vec<Vec<(f64, f64)>>,
    surface: &RasterSurface,
) -> PolygonFeature {
    let transform = surface.transform();
    // lattice corner (x, y) is the top-left of pixel (x, y): index (x - 0.5, y - 0.5)
    let project = |points: Vec<(f64, f64)>| {
        Ring::new(
            points
                .into_iter()
                .map(|(x, y)| Coord::from(transform.pixel_center_to_geo(x - 0.5, y - 0.5)))
                .collect(),
        )
    };

    PolygonFeature::new(
        component_id,
        project(exterior).oriented(true),
        holes
            .into_iter()
            .map(|hole| project(hole).oriented(false))
            .collect(),
        surface.crs().clone(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::raster::{AffineTransform, Crs};
    use crate::processors::geometry::validate_polygon;

    fn surface_for(mask: &BinaryMask, transform: AffineTransform) -> RasterSurface {
        RasterSurface::new(mask.width(), mask.height(), 1, transform, Crs::new("EPSG:32633"))
            .unwrap()
    }

    fn vectorize(rows: &[&str], min_pixels: usize) -> VectorizeOutput {
        let mask = BinaryMask::from_ascii(rows);
        let surface = surface_for(&mask, AffineTransform::identity());
        Vectorizer::new(min_pixels).vectorize(&mask, &surface).unwrap()
    }

    #[test]
    fn test_labels_components_in_discovery_order() {
        let mask = BinaryMask::from_ascii(&[
            "..#..#", //
            ".#...#",
            "......",
            "##....",
        ]);
        let labeled = label_components(&mask);
        assert_eq!(labeled.components.len(), 3);
        assert_eq!(labeled.components[0].pixel_count, 2);
        assert_eq!(labeled.components[1].pixel_count, 2);
        assert_eq!(labeled.components[2].min_row, 3);
        assert_eq!(labeled.labels[[1, 1]], 1);
        assert_eq!(labeled.labels[[1, 5]], 2);
        assert_eq!(labeled.labels[[3, 0]], 3);
    }

    #[test]
    fn test_single_pixel_maps_corners_through_pixel_centers() {
        let mut rows = vec!["......"; 5];
        rows[3] = "..#...";
        let output = vectorize(&rows, 1);
        assert_eq!(output.features.len(), 1);

        let exterior = output.features[0].exterior.coords();
        assert_eq!(exterior.len(), 4);
        for corner in [(2.0, 3.0), (3.0, 3.0), (3.0, 4.0), (2.0, 4.0)] {
            assert!(exterior.contains(&Coord::new(corner.0, corner.1)));
        }
        assert_eq!(output.features[0].area(), 1.0);
        assert!(output.features[0].exterior.is_ccw());
    }

    #[test]
    fn test_block_with_center_hole() {
        let output = vectorize(&[".....", ".###.", ".#.#.", ".###.", "....."], 1);
        assert_eq!(output.features.len(), 1);
        let feature = &output.features[0];
        assert_eq!(feature.holes.len(), 1);
        assert_eq!(feature.exterior.area(), 9.0);
        assert_eq!(feature.holes[0].signed_area(), -1.0);
        assert_eq!(feature.area(), 8.0);
        assert!(validate_polygon(feature).is_ok());
    }

    #[test]
    fn test_diagonal_pixels_form_one_valid_ring() {
        let output = vectorize(&["#.", ".#"], 1);
        assert_eq!(output.features.len(), 1);
        let feature = &output.features[0];
        assert!(feature.holes.is_empty());
        assert_eq!(feature.exterior.len(), 8);
        assert!((feature.area() - 2.0).abs() < 0.05);
        assert!(validate_polygon(feature).is_ok());
    }

    #[test]
    fn test_saddle_area_drift_matches_offset() {
        let output = vectorize(&["#.", ".#"], 1);
        let expected = 2.0 + 2.0 * SADDLE_OFFSET;
        assert!((output.features[0].area() - expected).abs() < 1e-9);

        let output = vectorize(&["##.", "##.", "..#"], 1);
        // runs of 2 and 1 meet at the single saddle vertex, passed twice
        let expected = 5.0 + 2.0 * SADDLE_OFFSET * (2.0 + 1.0) / 2.0;
        assert!((output.features[0].area() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_hole_touching_exterior_diagonally_stays_valid() {
        let output = vectorize(
            &[
                "#####", //
                "#...#",
                "#.#.#",
                "#...#",
                "####.",
            ],
            1,
        );
        assert_eq!(output.features.len(), 2);
        for feature in &output.features {
            assert!(validate_polygon(feature).is_ok(), "{feature:?}");
        }
        assert_eq!(output.features[0].holes.len(), 1);
    }

    #[test]
    fn test_checkerboard_is_one_valid_component() {
        let output = vectorize(&["#.#.", ".#.#", "#.#.", ".#.#"], 1);
        assert_eq!(output.features.len(), 1);
        let feature = &output.features[0];
        assert_eq!(feature.holes.len(), 2);
        assert!(validate_polygon(feature).is_ok());
        assert!((feature.area() - 8.0).abs() < 0.5);
    }

    #[test]
    fn test_small_components_are_dropped_before_tracing() {
        let output = vectorize(&["#....", ".....", "..###", "..###"], 2);
        assert_eq!(output.dropped_small_components, 1);
        assert_eq!(output.features.len(), 1);
        assert_eq!(output.features[0].component_id, 1);
    }

    #[test]
    fn test_vectorizing_twice_is_identical() {
        let rows = ["##..#", "#..##", "..#..", "#####"];
        assert_eq!(vectorize(&rows, 1), vectorize(&rows, 1));
    }

    #[test]
    fn test_georeferenced_area_and_orientation() {
        let mask = BinaryMask::from_fn(20, 20, |r, c| (5..15).contains(&r) && (4..14).contains(&c));
        let transform = AffineTransform::north_up(1000.0, 2000.0, 0.5);
        let surface = surface_for(&mask, transform);
        let output = Vectorizer::new(1).vectorize(&mask, &surface).unwrap();

        let feature = &output.features[0];
        assert_eq!(feature.area(), 25.0);
        assert!(feature.exterior.is_ccw());
        assert_eq!(feature.crs, Crs::new("EPSG:32633"));
        let xs: Vec<f64> = feature.exterior.coords().iter().map(|c| c.x).collect();
        assert!(xs.contains(&1002.0));
        assert!(xs.contains(&1007.0));
    }

    #[test]
    fn test_rejects_mask_surface_mismatch() {
        let mask = BinaryMask::new(4, 4);
        let surface = RasterSurface::new(5, 4, 1, AffineTransform::identity(), Crs::new("x"))
            .unwrap();
        assert!(Vectorizer::new(1).vectorize(&mask, &surface).is_err());
    }
}
