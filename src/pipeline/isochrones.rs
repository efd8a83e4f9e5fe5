use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use geojson::{Feature, JsonObject};
use indicatif::ProgressBar;
use serde_json::Value;

use super::{IsochroneSource, pause};
use crate::domain::TransitStop;
use crate::input::read_features;
use crate::output::{Checkpoint, write_feature_collection};

#[derive(Debug, Clone)]
pub struct IsochroneJob {
    pub output: PathBuf,
    pub checkpoint: Checkpoint,
    pub stop_delay: Duration,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IsochroneSummary {
    pub resumed_after: Option<i64>,
    pub processed: usize,
    pub skipped: Vec<i64>,
    pub polygons: usize,
}

/// Tag an isochrone polygon with the stop it belongs to
fn tag_polygon(mut polygon: Feature, stop: &TransitStop) -> Feature {
    let properties = polygon.properties.get_or_insert_with(JsonObject::new);
    properties.insert("railway".to_string(), Value::from(stop.railway.as_tag()));
    properties.insert("id".to_string(), Value::from(stop.id));
    polygon
}

/// Fetch isochrones for every stop past the checkpoint, in id order
///
/// After each stop the whole output collection (previous runs included) is
/// rewritten and then the checkpoint moves to that stop, so an interrupted
/// run resumes where it left off. Stops whose fetch fails are skipped and do
/// not move the checkpoint.
pub fn run_isochrone_job(
    source: &impl IsochroneSource,
    mut stops: Vec<TransitStop>,
    job: &IsochroneJob,
    progress: &ProgressBar,
) -> Result<IsochroneSummary> {
    let resumed_after = job
        .checkpoint
        .load()
        .context("Failed to read the resume marker")?;

    let mut collected = if job.output.exists() {
        read_features(&job.output).context("Failed to load existing isochrones")?
    } else {
        Vec::new()
    };

    stops.sort_by_key(|s| s.id);
    let pending: Vec<&TransitStop> = stops
        .iter()
        .filter(|s| resumed_after.is_none_or(|last| s.id > last))
        .collect();
    if let Some(last) = resumed_after {
        log::info!(
            "Resuming after stop {}: {} of {} stops left",
            last,
            pending.len(),
            stops.len()
        );
    }
    progress.set_length(pending.len() as u64);

    let mut summary = IsochroneSummary {
        resumed_after,
        ..Default::default()
    };

    for (idx, stop) in pending.into_iter().enumerate() {
        if idx > 0 {
            pause(job.stop_delay);
        }
        progress.set_message(format!("Stop {} ({})", stop.id, stop.railway));

        match source.fetch(stop) {
            Ok(polygons) => {
                summary.polygons += polygons.len();
                collected.extend(polygons.into_iter().map(|p| tag_polygon(p, stop)));

                write_feature_collection(&job.output, &collected)
                    .context("Failed to save isochrones")?;
                job.checkpoint
                    .save(stop.id)
                    .context("Failed to update the resume marker")?;

                log::info!("Processed stop with ID: {}", stop.id);
                summary.processed += 1;
            }
            Err(e) => {
                log::warn!(
                    "Skipping stop {} at {}, {}: {}",
                    stop.id,
                    stop.lat,
                    stop.lon,
                    e
                );
                summary.skipped.push(stop.id);
            }
        }
        progress.inc(1);
    }

    Ok(summary)
}
