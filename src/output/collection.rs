use anyhow::{Context, Result};
use geojson::feature::Id;
use geojson::{Feature, FeatureCollection};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::geometry::AssembledFeature;

/// GeoJSON feature for an assembled geometry, identified as `way/<id>` or `relation/<id>`
pub fn to_feature(assembled: &AssembledFeature) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::from(
            &assembled.geometry,
        ))),
        id: Some(Id::String(format!(
            "{}/{}",
            assembled.osm_type, assembled.osm_id
        ))),
        properties: Some(assembled.properties.clone()),
        foreign_members: None,
    }
}

/// Write features as a FeatureCollection
///
/// The file is written next to its destination first and then renamed over
/// it, so an interrupted run never leaves a truncated collection behind.
pub fn write_feature_collection(path: &Path, features: &[Feature]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let collection = FeatureCollection {
        bbox: None,
        features: features.to_vec(),
        foreign_members: None,
    };

    let tmp_path = temporary_path(path);
    let file = File::create(&tmp_path)
        .with_context(|| format!("Failed to create {}", tmp_path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &collection)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    writer.flush()?;
    drop(writer);

    fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to move {} into place", path.display()))?;
    Ok(())
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
