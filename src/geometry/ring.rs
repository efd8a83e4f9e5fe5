//! Ring construction and validity repair
//!
//! A ring is accepted when its coordinate sequence has at least
//! [`MIN_RING_COORDS`] pairs before closing. Polygons built from rings are
//! checked for self-intersections and zero area; invalid ones are passed
//! through a boolean normalization, the planar equivalent of a zero-width
//! buffer, which splits bow-ties into their lobes and drops slivers.

use geo::algorithm::line_intersection::LineIntersection;
use geo::algorithm::sweep::Intersections;
use geo::{Area, BooleanOps, Coord, Line, LineString, MultiPolygon, Polygon};

/// 3 distinct vertices plus the closing point
pub const MIN_RING_COORDS: usize = 4;

/// Areas at or below this (in square degrees) count as zero
pub const MIN_AREA: f64 = 1e-15;

pub fn has_finite_coords(coords: &[Coord<f64>]) -> bool {
    coords.iter().all(|c| c.x.is_finite() && c.y.is_finite())
}

pub fn is_closed(coords: &[Coord<f64>]) -> bool {
    coords.len() > 1 && coords.first() == coords.last()
}

/// Turn a coordinate sequence into a closed ring
///
/// Consecutive duplicate points are dropped first. Returns `None` when fewer
/// than [`MIN_RING_COORDS`] pairs remain.
pub fn close_ring(mut coords: Vec<Coord<f64>>) -> Option<LineString<f64>> {
    coords.dedup();
    if coords.len() < MIN_RING_COORDS {
        return None;
    }
    if !is_closed(&coords) {
        coords.push(coords[0]);
    }
    Some(LineString::new(coords))
}

/// Whether a simple polygon (no holes) is usable as-is
pub fn is_valid(polygon: &Polygon<f64>) -> bool {
    let exterior = polygon.exterior();
    exterior.0.len() >= MIN_RING_COORDS
        && has_finite_coords(&exterior.0)
        && polygon.unsigned_area() > MIN_AREA
        && !self_intersects(exterior)
}

/// Sweep-line search for crossings or overlaps between ring edges
///
/// Consecutive edges always meet at their shared vertex; that touch is not a
/// self-intersection.
fn self_intersects(ring: &LineString<f64>) -> bool {
    Intersections::from_iter(ring.lines()).any(|(a, b, hit)| match hit {
        LineIntersection::SinglePoint { intersection, .. } => {
            !(consecutive_at(&a, &b, intersection) || consecutive_at(&b, &a, intersection))
        }
        LineIntersection::Collinear { .. } => true,
    })
}

fn consecutive_at(first: &Line<f64>, second: &Line<f64>, point: Coord<f64>) -> bool {
    first.end == second.start && point == first.end
}

/// Validate a ring polygon, repairing it when needed
///
/// Returns `None` when nothing with a positive area is left.
pub fn repair(polygon: Polygon<f64>) -> Option<MultiPolygon<f64>> {
    if is_valid(&polygon) {
        return Some(MultiPolygon::new(vec![polygon]));
    }
    if !has_finite_coords(&polygon.exterior().0) {
        return None;
    }

    let normalized = MultiPolygon::new(vec![polygon]).union(&MultiPolygon::new(Vec::new()));
    let parts: Vec<Polygon<f64>> = normalized
        .into_iter()
        .filter(|p| p.unsigned_area() > MIN_AREA)
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(MultiPolygon::new(parts))
    }
}
