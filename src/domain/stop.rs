use std::fmt;

/// Rail mode of a transit stop, which decides how far people walk to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RailwayKind {
    Tram,
    Subway,
    LightRail,
    Monorail,
    Train,
    Other(String),
}

impl RailwayKind {
    pub fn from_tag(tag: &str) -> RailwayKind {
        match tag {
            "tram" => RailwayKind::Tram,
            "subway" => RailwayKind::Subway,
            "light_rail" => RailwayKind::LightRail,
            "monorail" => RailwayKind::Monorail,
            "train" => RailwayKind::Train,
            other => RailwayKind::Other(other.to_string()),
        }
    }

    pub fn as_tag(&self) -> &str {
        match self {
            RailwayKind::Tram => "tram",
            RailwayKind::Subway => "subway",
            RailwayKind::LightRail => "light_rail",
            RailwayKind::Monorail => "monorail",
            RailwayKind::Train => "train",
            RailwayKind::Other(tag) => tag,
        }
    }

    /// Walking time limit for the isochrone, in seconds
    pub fn time_limit_secs(&self) -> u32 {
        match self {
            RailwayKind::Tram => 480,
            RailwayKind::Subway | RailwayKind::LightRail | RailwayKind::Monorail => 720,
            RailwayKind::Train => 900,
            RailwayKind::Other(_) => 480,
        }
    }
}

impl fmt::Display for RailwayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

#[derive(Debug, Clone)]
pub struct TransitStop {
    pub id: i64,
    pub railway: RailwayKind,
    pub lat: f64,
    pub lon: f64,
}
