use crate::api::OverpassResponse;
use crate::domain::{Member, OsmElement, Relation, Role, Way};
use geo::Coord;
use std::collections::HashMap;

/// Resolve an Overpass response into ways and relations with coordinates
///
/// # Algorithm
/// 1. Build node_id → (lon, lat) lookup map from all node elements
/// 2. Resolve every way's node refs to coordinates, skipping missing nodes
/// 3. Resolve every relation's way members against the resolved ways
///
/// Ways come first, then relations, each in response order.
pub fn parse_elements(response: &OverpassResponse) -> Vec<OsmElement> {
    let nodes = build_node_lookup(response);

    let ways: Vec<Way> = response
        .elements
        .iter()
        .filter(|e| e.type_ == "way")
        .map(|e| {
            let node_refs = e.nodes.as_deref().unwrap_or_default();
            Way::new(
                e.id,
                e.tags.clone().unwrap_or_default(),
                resolve_way_to_coords(node_refs, &nodes),
            )
        })
        .collect();

    let relations: Vec<Relation> = {
        let way_lookup: HashMap<u64, &Way> = ways.iter().map(|w| (w.id, w)).collect();
        response
            .elements
            .iter()
            .filter(|e| e.type_ == "relation")
            .map(|e| Relation {
                id: e.id,
                tags: e.tags.clone().unwrap_or_default(),
                members: resolve_members(
                    e.id,
                    e.members.as_deref().unwrap_or_default(),
                    &way_lookup,
                ),
            })
            .collect()
    };

    ways.into_iter()
        .map(OsmElement::Way)
        .chain(relations.into_iter().map(OsmElement::Relation))
        .collect()
}

fn build_node_lookup(response: &OverpassResponse) -> HashMap<u64, Coord<f64>> {
    response
        .elements
        .iter()
        .filter(|e| e.type_ == "node")
        .filter_map(|e| {
            let lat = e.lat?;
            let lon = e.lon?;
            Some((e.id, Coord { x: lon, y: lat }))
        })
        .collect()
}

fn resolve_way_to_coords(node_refs: &[u64], nodes: &HashMap<u64, Coord<f64>>) -> Vec<Coord<f64>> {
    node_refs
        .iter()
        .filter_map(|id| nodes.get(id).copied())
        .collect()
}

fn resolve_members(
    relation_id: u64,
    members: &[crate::api::overpass::RelationMember],
    ways: &HashMap<u64, &Way>,
) -> Vec<Member> {
    members
        .iter()
        .filter(|m| m.type_ == "way")
        .filter_map(|m| match ways.get(&m.ref_) {
            Some(way) => Some(Member {
                role: Role::from_osm(&m.role),
                way: (*way).clone(),
            }),
            None => {
                log::debug!(
                    "Relation {}: member way {} missing from response",
                    relation_id,
                    m.ref_
                );
                None
            }
        })
        .collect()
}
