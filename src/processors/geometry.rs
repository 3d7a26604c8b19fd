//! Planar geometry for footprint polygons.
//!
//! This module provides the algorithms the post-processor relies on:
//! Douglas-Peucker simplification of open chains and closed rings, and a
//! validity check for polygons (simple rings, holes strictly inside the
//! exterior, holes pairwise disjoint).

use crate::domain::feature::{Coord, PolygonFeature, Ring};
use itertools::Itertools;

/// Calculates the perpendicular distance from a point to the line through
/// `line_start` and `line_end`.
///
/// Falls back to the point distance when the line is degenerate.
pub fn point_to_line_distance(point: &Coord, line_start: &Coord, line_end: &Coord) -> f64 {
    let a = line_end.y - line_start.y;
    let b = line_start.x - line_end.x;
    let c = line_end.x * line_start.y - line_start.x * line_end.y;

    let denominator = (a * a + b * b).sqrt();
    if denominator == 0.0 {
        return (point.x - line_start.x).hypot(point.y - line_start.y);
    }

    (a * point.x + b * point.y + c).abs() / denominator
}

/// Simplifies an open chain with the Douglas-Peucker algorithm.
///
/// Both endpoints are always kept. Every removed vertex lies within
/// `epsilon` of the simplified chain.
pub fn douglas_peucker(points: &[Coord], epsilon: f64) -> Vec<Coord> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    // Initialize a stack for iterative implementation
    let mut stack = vec![(0, points.len() - 1)];

    // Track which points to keep
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;

    while let Some((start, end)) = stack.pop() {
        if end - start <= 1 {
            continue;
        }

        let mut max_dist = 0.0;
        let mut max_index = start;
        for i in (start + 1)..end {
            let dist = point_to_line_distance(&points[i], &points[start], &points[end]);
            if dist > max_dist {
                max_dist = dist;
                max_index = i;
            }
        }

        if max_dist > epsilon {
            keep[max_index] = true;
            stack.push((start, max_index));
            stack.push((max_index, end));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

/// Simplifies a closed ring.
///
/// The ring is split at vertex 0 and at the vertex farthest from it; both
/// halves are simplified as open chains and rejoined.
pub fn simplify_ring(ring: &Ring, epsilon: f64) -> Ring {
    let coords = ring.coords();
    if coords.len() <= 3 || epsilon <= 0.0 {
        return ring.clone();
    }

    let origin = coords[0];
    let split = coords
        .iter()
        .enumerate()
        .skip(1)
        .map(|(i, c)| (i, (c.x - origin.x).hypot(c.y - origin.y)))
        .fold((1, f64::MIN), |best, cur| if cur.1 > best.1 { cur } else { best })
        .0;

    let first = douglas_peucker(&coords[..=split], epsilon);
    let second: Vec<Coord> = coords[split..].iter().chain([&origin]).copied().collect();
    let second = douglas_peucker(&second, epsilon);

    let mut simplified = first;
    simplified.pop();
    simplified.extend_from_slice(&second[..second.len() - 1]);
    Ring::new(simplified)
}

/// Signed area of the triangle `(a, b, c)`, doubled.
#[inline]
fn orient(a: &Coord, b: &Coord, c: &Coord) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Whether `p`, known to be collinear with `a`-`b`, lies within the segment.
#[inline]
fn within_bounds(a: &Coord, b: &Coord, p: &Coord) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// Whether two closed segments share at least one point.
pub fn segments_touch(p1: &Coord, p2: &Coord, q1: &Coord, q2: &Coord) -> bool {
    let d1 = orient(q1, q2, p1);
    let d2 = orient(q1, q2, p2);
    let d3 = orient(p1, p2, q1);
    let d4 = orient(p1, p2, q2);

    if d1 * d2 < 0.0 && d3 * d4 < 0.0 {
        return true;
    }

    (d1 == 0.0 && within_bounds(q1, q2, p1))
        || (d2 == 0.0 && within_bounds(q1, q2, p2))
        || (d3 == 0.0 && within_bounds(p1, p2, q1))
        || (d4 == 0.0 && within_bounds(p1, p2, q2))
}

/// Strict point-in-ring test by ray casting.
///
/// Points on the boundary may go either way; callers only query points that
/// are known not to lie on it.
pub fn point_in_ring(point: &Coord, ring: &Ring) -> bool {
    let mut inside = false;
    for (a, b) in ring.coords().iter().circular_tuple_windows() {
        if (a.y > point.y) != (b.y > point.y) {
            let x = a.x + (point.y - a.y) / (b.y - a.y) * (b.x - a.x);
            if point.x < x {
                inside = !inside;
            }
        }
    }
    inside
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    ring: usize,
    index: usize,
    a: Coord,
    b: Coord,
    min_x: f64,
    max_x: f64,
}

fn segments(rings: &[&Ring]) -> Vec<Segment> {
    let mut segments = Vec::new();
    for (ring_index, ring) in rings.iter().enumerate() {
        for (index, (a, b)) in ring.coords().iter().circular_tuple_windows().enumerate() {
            segments.push(Segment {
                ring: ring_index,
                index,
                a: *a,
                b: *b,
                min_x: a.x.min(b.x),
                max_x: a.x.max(b.x),
            });
        }
    }
    segments
}

/// Checks the shape of a single ring: enough distinct vertices, non-zero
/// area and no fold-back between consecutive edges.
fn check_ring_shape(ring: &Ring, name: &str) -> Result<(), String> {
    let coords = ring.coords();
    if coords.len() < 3 {
        return Err(format!("{name} has {} vertices, need at least 3", coords.len()));
    }
    if coords.iter().circular_tuple_windows().any(|(a, b)| a == b) {
        return Err(format!("{name} repeats a vertex"));
    }
    if ring.signed_area() == 0.0 {
        return Err(format!("{name} has zero area"));
    }
    for (a, b, c) in coords.iter().circular_tuple_windows() {
        let folds = orient(a, b, c) == 0.0
            && (b.x - a.x) * (c.x - b.x) + (b.y - a.y) * (c.y - b.y) < 0.0;
        if folds {
            return Err(format!("{name} folds back at ({}, {})", b.x, b.y));
        }
    }
    Ok(())
}

/// Finds the first pair of non-adjacent segments that touch, across all
/// given rings.
fn find_intersection(rings: &[&Ring]) -> Option<(usize, usize)> {
    let mut segments = segments(rings);
    segments.sort_by(|s, t| s.min_x.total_cmp(&t.min_x));

    for (i, s) in segments.iter().enumerate() {
        for t in &segments[i + 1..] {
            if t.min_x > s.max_x {
                break;
            }
            if s.ring == t.ring {
                let n = rings[s.ring].len();
                let adjacent = (s.index + 1) % n == t.index || (t.index + 1) % n == s.index;
                if adjacent {
                    continue;
                }
            }
            if segments_touch(&s.a, &s.b, &t.a, &t.b) {
                return Some((s.ring, t.ring));
            }
        }
    }
    None
}

/// Validates a single ring: see [`validate_polygon`].
pub fn validate_ring(ring: &Ring) -> Result<(), String> {
    check_ring_shape(ring, "ring")?;
    match find_intersection(&[ring]) {
        Some(_) => Err("ring self-intersects".to_string()),
        None => Ok(()),
    }
}

/// Validates a polygon.
///
/// A valid polygon has simple rings with at least three distinct vertices
/// and non-zero area, no two rings touching, every hole strictly inside the
/// exterior and no hole inside another.
pub fn validate_polygon(feature: &PolygonFeature) -> Result<(), String> {
    check_ring_shape(&feature.exterior, "exterior")?;
    for (i, hole) in feature.holes.iter().enumerate() {
        check_ring_shape(hole, &format!("hole {i}"))?;
    }

    let rings: Vec<&Ring> = feature.rings().collect();
    if let Some((r1, r2)) = find_intersection(&rings) {
        return Err(match (r1.min(r2), r1.max(r2)) {
            (0, 0) => "exterior self-intersects".to_string(),
            (0, h) => format!("hole {} touches the exterior", h - 1),
            (h1, h2) if h1 == h2 => format!("hole {} self-intersects", h1 - 1),
            (h1, h2) => format!("holes {} and {} touch", h1 - 1, h2 - 1),
        });
    }

    // rings are disjoint, so one vertex decides containment
    for (i, hole) in feature.holes.iter().enumerate() {
        if !point_in_ring(&hole.coords()[0], &feature.exterior) {
            return Err(format!("hole {i} lies outside the exterior"));
        }
        for (j, other) in feature.holes.iter().enumerate() {
            if i != j && point_in_ring(&hole.coords()[0], other) {
                return Err(format!("hole {i} lies inside hole {j}"));
            }
        }
    }
    Ok(())
}
