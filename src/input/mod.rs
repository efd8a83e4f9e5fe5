//! Areas of interest and transit stops, read from GeoJSON in WGS84

use std::path::Path;

use anyhow::{Context, Result, bail};
use geo::BoundingRect;
use geojson::{Feature, GeoJson};
use serde_json::Value;

use crate::domain::{AreaOfInterest, BBox, RailwayKind, TransitStop};

pub fn read_features(path: &Path) -> Result<Vec<Feature>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let geojson = raw
        .parse::<GeoJson>()
        .with_context(|| format!("Failed to parse GeoJSON in {}", path.display()))?;

    match geojson {
        GeoJson::FeatureCollection(collection) => Ok(collection.features),
        GeoJson::Feature(feature) => Ok(vec![feature]),
        GeoJson::Geometry(_) => bail!("{} holds a bare geometry, expected features", path.display()),
    }
}

/// One area per feature, named by `name_field`, bounded by the feature's geometry
pub fn read_areas(path: &Path, name_field: &str) -> Result<Vec<AreaOfInterest>> {
    read_features(path)?
        .into_iter()
        .enumerate()
        .map(|(idx, feature)| {
            area_from_feature(&feature, name_field)
                .with_context(|| format!("Feature #{} in {}", idx, path.display()))
        })
        .collect()
}

fn area_from_feature(feature: &Feature, name_field: &str) -> Result<AreaOfInterest> {
    let name = feature
        .property(name_field)
        .and_then(value_to_string)
        .with_context(|| format!("Missing \"{}\" property", name_field))?;

    let geometry = feature
        .geometry
        .clone()
        .with_context(|| format!("Area {} has no geometry", name))?;
    let geometry: geo::Geometry<f64> = geometry
        .try_into()
        .with_context(|| format!("Area {} has an unsupported geometry", name))?;
    let rect = geometry
        .bounding_rect()
        .with_context(|| format!("Area {} has an empty geometry", name))?;

    Ok(AreaOfInterest::new(name, BBox::from(rect)))
}

/// Stops with an `id` and `railway` property. Position comes from
/// `latitude`/`longitude` properties when present, otherwise from the point geometry.
pub fn read_stops(path: &Path) -> Result<Vec<TransitStop>> {
    read_features(path)?
        .into_iter()
        .enumerate()
        .map(|(idx, feature)| {
            stop_from_feature(&feature)
                .with_context(|| format!("Feature #{} in {}", idx, path.display()))
        })
        .collect()
}

fn stop_from_feature(feature: &Feature) -> Result<TransitStop> {
    let id = feature
        .property("id")
        .and_then(value_to_i64)
        .context("Missing or non-integer \"id\" property")?;

    let railway = feature
        .property("railway")
        .and_then(value_to_string)
        .map(|tag| RailwayKind::from_tag(&tag))
        .unwrap_or_else(|| RailwayKind::Other(String::new()));

    let from_props = feature
        .property("latitude")
        .and_then(Value::as_f64)
        .zip(feature.property("longitude").and_then(Value::as_f64));

    let (lat, lon) = match from_props {
        Some(position) => position,
        None => point_position(feature).with_context(|| format!("Stop {} has no position", id))?,
    };

    Ok(TransitStop {
        id,
        railway,
        lat,
        lon,
    })
}

fn point_position(feature: &Feature) -> Option<(f64, f64)> {
    match &feature.geometry.as_ref()?.value {
        geojson::Value::Point(position) if position.len() >= 2 => Some((position[1], position[0])),
        _ => None,
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const AREAS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"Name_EN": "Poznan"},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[16.8, 52.3], [17.1, 52.3], [17.1, 52.5], [16.8, 52.5], [16.8, 52.3]]]
                }
            }
        ]
    }"#;

    #[test]
    fn test_read_areas() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("areas.geojson");
        fs::write(&path, AREAS).unwrap();

        let areas = read_areas(&path, "Name_EN").unwrap();
        assert_eq!(areas.len(), 1);
        assert_eq!(areas[0].name, "Poznan");
        assert_eq!(areas[0].bbox, BBox::new(52.3, 16.8, 52.5, 17.1));
    }

    #[test]
    fn test_missing_name_field_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("areas.geojson");
        fs::write(&path, AREAS).unwrap();

        let err = read_areas(&path, "NAME").unwrap_err();
        assert!(format!("{:#}", err).contains("Missing \"NAME\" property"));
    }

    #[test]
    fn test_read_stops() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stops.geojson");
        fs::write(
            &path,
            r#"{
                "type": "FeatureCollection",
                "features": [
                    {
                        "type": "Feature",
                        "properties": {"id": 3, "railway": "tram", "latitude": 52.41, "longitude": 16.92},
                        "geometry": null
                    },
                    {
                        "type": "Feature",
                        "properties": {"id": "7", "railway": "train"},
                        "geometry": {"type": "Point", "coordinates": [16.95, 52.40]}
                    }
                ]
            }"#,
        )
        .unwrap();

        let stops = read_stops(&path).unwrap();
        assert_eq!(stops.len(), 2);
        assert_eq!(stops[0].id, 3);
        assert_eq!(stops[0].railway, RailwayKind::Tram);
        assert_eq!((stops[0].lat, stops[0].lon), (52.41, 16.92));
        assert_eq!(stops[1].id, 7);
        assert_eq!(stops[1].railway, RailwayKind::Train);
        assert_eq!((stops[1].lat, stops[1].lon), (52.40, 16.95));
    }

    #[test]
    fn test_value_to_i64() {
        assert_eq!(value_to_i64(&Value::from(12)), Some(12));
        assert_eq!(value_to_i64(&Value::from(12.0)), Some(12));
        assert_eq!(value_to_i64(&Value::from(12.5)), None);
        assert_eq!(value_to_i64(&Value::from(" 4 ")), Some(4));
        assert_eq!(value_to_i64(&Value::Null), None);
    }
}
