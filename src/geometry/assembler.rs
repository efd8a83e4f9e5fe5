//! Multipolygon assembly from OSM relation members
//!
//! # Algorithm
//! 1. Split members into outer and inner coordinate segments by role
//! 2. Chain open outer segments into rings when the boundary is split across ways
//! 3. Close every ring, dropping the ones with fewer than 4 coordinates
//! 4. Validate each ring polygon and repair or discard invalid ones
//! 5. Union outers, union inners, subtract inners from outers

use geo::{Area, BooleanOps, Coord, Geometry, LineString, MultiPolygon, Polygon};
use geojson::JsonObject;
use thiserror::Error;

use super::chain::chain_segments;
use super::ring::{self, MIN_AREA};
use crate::domain::{FeatureKind, OsmElement, Relation, Role, Way};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("way {way} has a non-finite coordinate")]
    InvalidCoordinate { way: u64 },
}

/// A geometry ready for serialization, with the properties of the element it came from
#[derive(Debug, Clone)]
pub struct AssembledFeature {
    pub osm_type: &'static str,
    pub osm_id: u64,
    pub geometry: Geometry<f64>,
    pub properties: JsonObject,
}

/// Build the output feature for an element, if it is one `kind` cares about
///
/// `Ok(None)` means the element is skipped: it is not relevant for `kind`, is a
/// relation other than a multipolygon, or no valid outer ring survived.
pub fn assemble_element(
    element: &OsmElement,
    kind: FeatureKind,
) -> Result<Option<AssembledFeature>, AssemblyError> {
    if !kind.accepts(element.tags()) {
        return Ok(None);
    }

    let geometry = match element {
        OsmElement::Way(way) => assemble_way(way)?,
        OsmElement::Relation(relation) if relation.is_multipolygon() => {
            assemble_relation(relation)?
        }
        OsmElement::Relation(_) => None,
    };

    Ok(geometry.map(|geometry| AssembledFeature {
        osm_type: element.kind(),
        osm_id: element.id(),
        geometry,
        properties: kind.properties(element.tags()),
    }))
}

/// A plain closed way as a single ring
pub fn assemble_way(way: &Way) -> Result<Option<Geometry<f64>>, AssemblyError> {
    if !ring::has_finite_coords(&way.coords) {
        return Err(AssemblyError::InvalidCoordinate { way: way.id });
    }
    if !way.is_closed() {
        log::debug!("Way {} is open, closing it", way.id);
    }

    let polygon = ring::close_ring(way.coords.clone())
        .map(|exterior| Polygon::new(exterior, Vec::new()))
        .and_then(ring::repair);

    Ok(polygon.and_then(into_geometry))
}

/// Outer boundaries minus inner boundaries of a multipolygon relation
pub fn assemble_relation(relation: &Relation) -> Result<Option<Geometry<f64>>, AssemblyError> {
    let (outer_segments, inner_segments) = collect_segments(relation)?;
    if outer_segments.is_empty() {
        return Ok(None);
    }

    let outers: Vec<MultiPolygon<f64>> = outer_rings(outer_segments)
        .into_iter()
        .filter_map(|exterior| ring::repair(Polygon::new(exterior, Vec::new())))
        .collect();
    if outers.is_empty() {
        return Ok(None);
    }

    let holes: Vec<MultiPolygon<f64>> = inner_segments
        .into_iter()
        .filter_map(ring::close_ring)
        .filter_map(|exterior| ring::repair(Polygon::new(exterior, Vec::new())))
        .collect();

    let outer = union_all(outers);
    let shape = if holes.is_empty() {
        outer
    } else {
        outer.difference(&union_all(holes))
    };

    Ok(into_geometry(shape))
}

type Segments = Vec<Vec<Coord<f64>>>;

fn collect_segments(relation: &Relation) -> Result<(Segments, Segments), AssemblyError> {
    let mut outer = Vec::new();
    let mut inner = Vec::new();

    for member in &relation.members {
        let target = match member.role {
            Role::Outer => &mut outer,
            Role::Inner => &mut inner,
            Role::Other => continue,
        };
        if !ring::has_finite_coords(&member.way.coords) {
            return Err(AssemblyError::InvalidCoordinate { way: member.way.id });
        }
        if member.way.coords.is_empty() {
            continue;
        }
        target.push(member.way.coords.clone());
    }

    Ok((outer, inner))
}

/// Closed rings for the outer boundary
///
/// Segments that are already closed stand alone. When there are several outer
/// segments, the open ones are chained together first.
fn outer_rings(segments: Segments) -> Vec<LineString<f64>> {
    let (mut closed, open): (Segments, Segments) =
        segments.into_iter().partition(|s| ring::is_closed(s));

    if closed.len() + open.len() > 1 {
        closed.extend(chain_segments(open));
    } else {
        closed.extend(open);
    }

    closed.into_iter().filter_map(ring::close_ring).collect()
}

/// Union a list of multipolygons, leaving a lone entry untouched
pub fn union_all(mut shapes: Vec<MultiPolygon<f64>>) -> MultiPolygon<f64> {
    let Some(first) = shapes.pop() else {
        return MultiPolygon::new(Vec::new());
    };
    if shapes.is_empty() {
        return first;
    }
    shapes
        .iter()
        .fold(first, |acc, shape| acc.union(shape))
}

/// Drop slivers, then unwrap a single part into a plain polygon
pub fn into_geometry(shape: MultiPolygon<f64>) -> Option<Geometry<f64>> {
    let mut parts: Vec<Polygon<f64>> = shape
        .into_iter()
        .filter(|p| p.unsigned_area() > MIN_AREA)
        .collect();

    match parts.len() {
        0 => None,
        1 => parts.pop().map(Geometry::Polygon),
        _ => Some(Geometry::MultiPolygon(MultiPolygon::new(parts))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Member, Tags};
    use geo::coord;

    fn coords(points: &[(f64, f64)]) -> Vec<Coord<f64>> {
        points.iter().map(|&(x, y)| coord! { x: x, y: y }).collect()
    }

    fn way(id: u64, points: &[(f64, f64)]) -> Way {
        Way::new(id, Tags::new(), coords(points))
    }

    fn member(role: Role, id: u64, points: &[(f64, f64)]) -> Member {
        Member {
            role,
            way: way(id, points),
        }
    }

    fn multipolygon(members: Vec<Member>) -> Relation {
        Relation {
            id: 1,
            tags: Tags::from([
                ("type".to_string(), "multipolygon".to_string()),
                ("natural".to_string(), "water".to_string()),
                ("name".to_string(), "Lake".to_string()),
            ]),
            members,
        }
    }

    const SQUARE: &[(f64, f64)] = &[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)];
    const HOLE: &[(f64, f64)] = &[(2.0, 2.0), (4.0, 2.0), (4.0, 4.0), (2.0, 4.0), (2.0, 2.0)];

    #[test]
    fn test_single_outer_ring_is_returned_unchanged() {
        let relation = multipolygon(vec![member(Role::Outer, 10, SQUARE)]);
        let geometry = assemble_relation(&relation).unwrap().unwrap();

        let expected = Polygon::new(LineString::new(coords(SQUARE)), Vec::new());
        assert_eq!(geometry, Geometry::Polygon(expected));
    }

    #[test]
    fn test_hole_is_subtracted() {
        let relation = multipolygon(vec![
            member(Role::Outer, 10, SQUARE),
            member(Role::Inner, 11, HOLE),
        ]);
        let geometry = assemble_relation(&relation).unwrap().unwrap();

        let Geometry::Polygon(polygon) = &geometry else {
            panic!("expected a polygon, got {:?}", geometry);
        };
        assert_eq!(polygon.interiors().len(), 1);
        assert!((geometry.unsigned_area() - 96.0).abs() < 1e-6);
    }

    #[test]
    fn test_hole_outside_outer_contributes_nothing() {
        let relation = multipolygon(vec![
            member(Role::Outer, 10, SQUARE),
            member(
                Role::Inner,
                11,
                &[(20.0, 20.0), (21.0, 20.0), (21.0, 21.0), (20.0, 21.0)],
            ),
        ]);
        let geometry = assemble_relation(&relation).unwrap().unwrap();
        assert!((geometry.unsigned_area() - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_outer_split_across_two_ways() {
        let relation = multipolygon(vec![
            member(Role::Outer, 10, &[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]),
            member(Role::Outer, 11, &[(1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]),
        ]);
        let geometry = assemble_relation(&relation).unwrap().unwrap();

        let expected = Polygon::new(
            LineString::new(coords(&[
                (0.0, 0.0),
                (1.0, 0.0),
                (1.0, 1.0),
                (0.0, 1.0),
                (0.0, 0.0),
            ])),
            Vec::new(),
        );
        assert_eq!(geometry, Geometry::Polygon(expected));
    }

    #[test]
    fn test_reversed_outer_way_is_recovered_by_repair() {
        // Second half stored against the ring direction: attached backwards, then repaired
        let relation = multipolygon(vec![
            member(Role::Outer, 10, &[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]),
            member(Role::Outer, 11, &[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0)]),
        ]);
        let geometry = assemble_relation(&relation).unwrap().unwrap();

        assert!((geometry.unsigned_area() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_overlapping_outers_are_unioned() {
        let relation = multipolygon(vec![
            member(Role::Outer, 10, &[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0), (0.0, 0.0)]),
            member(Role::Outer, 11, &[(1.0, 0.0), (3.0, 0.0), (3.0, 2.0), (1.0, 2.0), (1.0, 0.0)]),
        ]);
        let geometry = assemble_relation(&relation).unwrap().unwrap();

        assert!(matches!(geometry, Geometry::Polygon(_)));
        assert!((geometry.unsigned_area() - 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_disjoint_outers_make_a_multipolygon() {
        let relation = multipolygon(vec![
            member(Role::Outer, 10, SQUARE),
            member(
                Role::Outer,
                11,
                &[(20.0, 20.0), (21.0, 20.0), (21.0, 21.0), (20.0, 21.0), (20.0, 20.0)],
            ),
        ]);
        let geometry = assemble_relation(&relation).unwrap().unwrap();

        let Geometry::MultiPolygon(parts) = &geometry else {
            panic!("expected a multipolygon, got {:?}", geometry);
        };
        assert_eq!(parts.0.len(), 2);
        assert!((geometry.unsigned_area() - 101.0).abs() < 1e-6);
    }

    #[test]
    fn test_no_outer_members_is_not_representable() {
        let relation = multipolygon(vec![
            member(Role::Inner, 11, HOLE),
            member(Role::Other, 12, SQUARE),
        ]);
        assert_eq!(assemble_relation(&relation).unwrap(), None);
    }

    #[test]
    fn test_short_outer_is_dropped() {
        let relation = multipolygon(vec![member(
            Role::Outer,
            10,
            &[(0.0, 0.0), (1.0, 0.0), (0.0, 0.0)],
        )]);
        assert_eq!(assemble_relation(&relation).unwrap(), None);
    }

    #[test]
    fn test_non_finite_coordinate_is_an_error() {
        let relation = multipolygon(vec![member(
            Role::Outer,
            42,
            &[(0.0, 0.0), (f64::NAN, 0.0), (1.0, 1.0), (0.0, 0.0)],
        )]);
        assert_eq!(
            assemble_relation(&relation),
            Err(AssemblyError::InvalidCoordinate { way: 42 })
        );
    }

    #[test]
    fn test_assembly_is_idempotent() {
        let relation = multipolygon(vec![
            member(Role::Outer, 10, &[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]),
            member(Role::Outer, 11, &[(10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]),
            member(Role::Inner, 12, HOLE),
        ]);

        let first = assemble_relation(&relation).unwrap().unwrap();
        let second = assemble_relation(&relation).unwrap().unwrap();
        assert_eq!(first, second);
        assert!((first.unsigned_area() - 96.0).abs() < 1e-6);
    }

    #[test]
    fn test_way_with_three_nodes_is_excluded() {
        let w = way(5, &[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]);
        assert_eq!(assemble_way(&w).unwrap(), None);
    }

    #[test]
    fn test_open_way_is_closed() {
        let w = way(5, &[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        let geometry = assemble_way(&w).unwrap().unwrap();
        assert!((geometry.unsigned_area() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_assemble_element_filters_by_kind() {
        let mut tags = Tags::new();
        tags.insert("building".to_string(), "house".to_string());
        let building = OsmElement::Way(Way::new(9, tags, coords(SQUARE)));

        assert!(
            assemble_element(&building, FeatureKind::Water)
                .unwrap()
                .is_none()
        );

        let feature = assemble_element(&building, FeatureKind::Buildings)
            .unwrap()
            .unwrap();
        assert_eq!(feature.osm_type, "way");
        assert_eq!(feature.osm_id, 9);
        assert_eq!(feature.properties["building"], "house");
    }

    #[test]
    fn test_assemble_element_skips_non_multipolygon_relations() {
        let mut relation = multipolygon(vec![member(Role::Outer, 10, SQUARE)]);
        relation
            .tags
            .insert("type".to_string(), "boundary".to_string());
        let element = OsmElement::Relation(relation);

        assert!(
            assemble_element(&element, FeatureKind::Water)
                .unwrap()
                .is_none()
        );
    }
}
