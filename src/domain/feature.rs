use geojson::JsonObject;
use serde_json::Value;

use super::osm::Tags;

/// A single Overpass tag filter, `["key"]` or `["key"="value"]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagFilter {
    pub key: &'static str,
    pub value: Option<&'static str>,
}

impl TagFilter {
    const fn key(key: &'static str) -> Self {
        Self { key, value: None }
    }

    const fn key_value(key: &'static str, value: &'static str) -> Self {
        Self {
            key,
            value: Some(value),
        }
    }

    pub fn matches(&self, tags: &Tags) -> bool {
        match (tags.get(self.key), self.value) {
            (Some(_), None) => true,
            (Some(actual), Some(expected)) => actual == expected,
            (None, _) => false,
        }
    }

    /// Overpass QL selector, e.g. `["natural"="water"]`
    pub fn to_overpass(&self) -> String {
        match self.value {
            Some(value) => format!(r#"["{}"="{}"]"#, self.key, value),
            None => format!(r#"["{}"]"#, self.key),
        }
    }
}

const WATER_FILTERS: &[TagFilter] = &[TagFilter::key_value("natural", "water")];
const BUILDING_FILTERS: &[TagFilter] = &[TagFilter::key("building")];
const BUILDING_LEVEL_FILTERS: &[TagFilter] =
    &[TagFilter::key("building"), TagFilter::key("building:levels")];

/// Which kind of area features a run collects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    Water,
    Buildings,
    BuildingLevels,
}

impl FeatureKind {
    pub fn filters(&self) -> &'static [TagFilter] {
        match self {
            FeatureKind::Water => WATER_FILTERS,
            FeatureKind::Buildings => BUILDING_FILTERS,
            FeatureKind::BuildingLevels => BUILDING_LEVEL_FILTERS,
        }
    }

    /// Default output file name; `{name}` is replaced by the area name
    pub fn default_template(&self) -> &'static str {
        match self {
            FeatureKind::Water => "water_bodies_{name}.geojson",
            FeatureKind::Buildings | FeatureKind::BuildingLevels => "buildings_{name}.geojson",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FeatureKind::Water => "water bodies",
            FeatureKind::Buildings => "buildings",
            FeatureKind::BuildingLevels => "buildings with levels",
        }
    }

    /// Whether an element with these tags should become an output feature
    pub fn accepts(&self, tags: &Tags) -> bool {
        if !self.filters().iter().any(|f| f.matches(tags)) {
            return false;
        }
        match self {
            FeatureKind::BuildingLevels => tags
                .get("building:levels")
                .is_some_and(|levels| !levels.is_empty()),
            _ => true,
        }
    }

    /// Feature-level properties taken from the element's tags
    pub fn properties(&self, tags: &Tags) -> JsonObject {
        let mut props = JsonObject::new();
        match self {
            FeatureKind::Water => {
                let name = tags.get("name").map(String::as_str).unwrap_or("Unknown");
                props.insert("name".to_string(), Value::from(name));
            }
            FeatureKind::Buildings => {
                props.insert("building".to_string(), optional_tag(tags, "building"));
            }
            FeatureKind::BuildingLevels => {
                props.insert("building".to_string(), optional_tag(tags, "building"));
                if let Some(levels) = tags.get("building:levels") {
                    props.insert(
                        "building:levels".to_string(),
                        Value::from(parse_levels(levels)),
                    );
                }
                if let Some(height) = tags.get("building:height").or_else(|| tags.get("height")) {
                    props.insert("building:height".to_string(), Value::from(height.as_str()));
                }
            }
        }
        props
    }
}

fn optional_tag(tags: &Tags, key: &str) -> Value {
    tags.get(key)
        .map(|v| Value::from(v.as_str()))
        .unwrap_or(Value::Null)
}

/// Level counts must be plain digits; anything else ("2.5", "3;4", "ground") counts as 1
pub fn parse_levels(raw: &str) -> u32 {
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return 1;
    }
    raw.parse().unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_tag_filter_to_overpass() {
        assert_eq!(WATER_FILTERS[0].to_overpass(), r#"["natural"="water"]"#);
        assert_eq!(BUILDING_FILTERS[0].to_overpass(), r#"["building"]"#);
    }

    #[test]
    fn test_water_accepts_only_natural_water() {
        assert!(FeatureKind::Water.accepts(&tags(&[("natural", "water")])));
        assert!(!FeatureKind::Water.accepts(&tags(&[("natural", "wood")])));
        assert!(!FeatureKind::Water.accepts(&tags(&[])));
    }

    #[test]
    fn test_building_levels_requires_levels() {
        assert!(!FeatureKind::BuildingLevels.accepts(&tags(&[("building", "yes")])));
        assert!(FeatureKind::BuildingLevels.accepts(&tags(&[("building:levels", "4")])));
        assert!(FeatureKind::Buildings.accepts(&tags(&[("building", "yes")])));
    }

    #[test]
    fn test_water_properties_default_name() {
        let props = FeatureKind::Water.properties(&tags(&[("natural", "water")]));
        assert_eq!(props["name"], "Unknown");

        let props = FeatureKind::Water.properties(&tags(&[("name", "Jezioro Maltańskie")]));
        assert_eq!(props["name"], "Jezioro Maltańskie");
    }

    #[test]
    fn test_building_properties() {
        let props = FeatureKind::Buildings.properties(&tags(&[]));
        assert_eq!(props["building"], Value::Null);

        let props = FeatureKind::BuildingLevels.properties(&tags(&[
            ("building", "apartments"),
            ("building:levels", "5"),
            ("building:height", "16"),
        ]));
        assert_eq!(props["building"], "apartments");
        assert_eq!(props["building:levels"], 5);
        assert_eq!(props["building:height"], "16");
    }

    #[test]
    fn test_parse_levels() {
        assert_eq!(parse_levels("3"), 3);
        assert_eq!(parse_levels("2.5"), 1);
        assert_eq!(parse_levels("-1"), 1);
        assert_eq!(parse_levels(""), 1);
        assert_eq!(parse_levels("99999999999999999999"), 1);
    }
}
