pub mod area;
pub mod feature;
pub mod osm;
pub mod stop;

pub use area::{AreaOfInterest, BBox};
pub use feature::{FeatureKind, TagFilter};
pub use osm::{Member, OsmElement, Relation, Role, Tags, Way};
pub use stop::{RailwayKind, TransitStop};
