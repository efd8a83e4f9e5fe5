use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use geo::MultiPolygon;
use geojson::{Feature, JsonObject};
use serde_json::Value;

use crate::geometry::{into_geometry, union_all};
use crate::input::read_features;
use crate::output::write_feature_collection;

fn group_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn polygonal(feature: &Feature) -> Option<MultiPolygon<f64>> {
    let geometry: geo::Geometry<f64> = feature.geometry.clone()?.try_into().ok()?;
    match geometry {
        geo::Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p])),
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        _ => None,
    }
}

/// Merge polygon features sharing the same `field` value into one feature each
///
/// Features without the field (or with a null value) and non-polygon
/// geometries are dropped. Output is ordered by the field value.
pub fn dissolve_features(features: &[Feature], field: &str) -> Vec<Feature> {
    let mut groups: BTreeMap<String, Vec<MultiPolygon<f64>>> = BTreeMap::new();

    for feature in features {
        let Some(key) = feature.property(field).and_then(group_key) else {
            continue;
        };
        let Some(shape) = polygonal(feature) else {
            continue;
        };
        groups.entry(key).or_default().push(shape);
    }

    groups
        .into_iter()
        .filter_map(|(key, shapes)| {
            let geometry = into_geometry(union_all(shapes))?;
            let mut properties = JsonObject::new();
            properties.insert(field.to_string(), Value::from(key));
            Some(Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(geojson::Value::from(&geometry))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            })
        })
        .collect()
}

/// Dissolve every `.geojson` file in `input_dir` into a file of the same name in `output_dir`
pub fn dissolve_directory(input_dir: &Path, output_dir: &Path, field: &str) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let mut inputs: Vec<PathBuf> = std::fs::read_dir(input_dir)
        .with_context(|| format!("Failed to list {}", input_dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "geojson"))
        .collect();
    inputs.sort();

    let mut written = Vec::new();
    for input in inputs {
        let Some(file_name) = input.file_name() else {
            continue;
        };
        let features = read_features(&input)?;
        let dissolved = dissolve_features(&features, field);

        let output = output_dir.join(file_name);
        write_feature_collection(&output, &dissolved)?;
        log::info!(
            "Dissolved {} features into {} in {}",
            features.len(),
            dissolved.len(),
            output.display()
        );
        written.push(output);
    }

    Ok(written)
}
