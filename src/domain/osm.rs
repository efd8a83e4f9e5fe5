use std::collections::HashMap;

use geo::Coord;

pub type Tags = HashMap<String, String>;

/// Role of a relation member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Outer,
    Inner,
    /// Anything else (`""`, `"label"`, `"subarea"`, ...). Ignored when assembling.
    Other,
}

impl Role {
    pub fn from_osm(role: &str) -> Role {
        match role {
            "outer" => Role::Outer,
            "inner" => Role::Inner,
            _ => Role::Other,
        }
    }
}

/// A way with its node references resolved to (lon, lat) coordinates
#[derive(Debug, Clone)]
pub struct Way {
    pub id: u64,
    pub tags: Tags,
    pub coords: Vec<Coord<f64>>,
}

impl Way {
    pub fn new(id: u64, tags: Tags, coords: Vec<Coord<f64>>) -> Self {
        Self { id, tags, coords }
    }

    pub fn is_closed(&self) -> bool {
        match (self.coords.first(), self.coords.last()) {
            (Some(first), Some(last)) => self.coords.len() > 1 && first == last,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Member {
    pub role: Role,
    pub way: Way,
}

#[derive(Debug, Clone)]
pub struct Relation {
    pub id: u64,
    pub tags: Tags,
    pub members: Vec<Member>,
}

impl Relation {
    pub fn is_multipolygon(&self) -> bool {
        self.tags.get("type").map(String::as_str) == Some("multipolygon")
    }
}

/// The two OSM element shapes an area feature can come from
#[derive(Debug, Clone)]
pub enum OsmElement {
    Way(Way),
    Relation(Relation),
}

impl OsmElement {
    pub fn id(&self) -> u64 {
        match self {
            OsmElement::Way(w) => w.id,
            OsmElement::Relation(r) => r.id,
        }
    }

    pub fn tags(&self) -> &Tags {
        match self {
            OsmElement::Way(w) => &w.tags,
            OsmElement::Relation(r) => &r.tags,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            OsmElement::Way(_) => "way",
            OsmElement::Relation(_) => "relation",
        }
    }
}
