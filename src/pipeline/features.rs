use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use geojson::Feature;
use indicatif::ProgressBar;

use super::{FeatureSource, pause};
use crate::api::OverpassResponse;
use crate::domain::{AreaOfInterest, FeatureKind};
use crate::geometry::assemble_element;
use crate::osm::parse_elements;
use crate::output::{to_feature, write_feature_collection};

#[derive(Debug, Clone)]
pub struct FeatureJob {
    pub kind: FeatureKind,
    pub output_dir: PathBuf,
    /// Output file name, `{name}` is replaced by the area name
    pub template: String,
    pub split_quadrants: bool,
    pub area_delay: Duration,
}

impl FeatureJob {
    pub fn new(kind: FeatureKind, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            output_dir: output_dir.into(),
            template: kind.default_template().to_string(),
            split_quadrants: false,
            area_delay: Duration::from_secs(15),
        }
    }

    pub fn output_path(&self, area: &AreaOfInterest) -> PathBuf {
        self.output_dir.join(area.file_name(&self.template))
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FeatureSummary {
    pub written: Vec<PathBuf>,
    pub empty: Vec<String>,
    pub failed: Vec<String>,
}

/// Turn an Overpass response into output features for `kind`
///
/// Elements that are not relevant, not representable or carry broken
/// coordinates are left out; everything else becomes exactly one feature.
pub fn collect_features(response: &OverpassResponse, kind: FeatureKind) -> Vec<Feature> {
    let mut features = Vec::new();

    for element in parse_elements(response) {
        match assemble_element(&element, kind) {
            Ok(Some(assembled)) => features.push(to_feature(&assembled)),
            Ok(None) => {}
            Err(e) => log::warn!("Skipping {} {}: {}", element.kind(), element.id(), e),
        }
    }

    features
}

/// Download, assemble and write `job.kind` features for every area in turn
///
/// Fetch failures skip the area. Failing to write an output file stops the run.
pub fn run_feature_job(
    source: &impl FeatureSource,
    areas: &[AreaOfInterest],
    job: &FeatureJob,
    progress: &ProgressBar,
) -> Result<FeatureSummary> {
    let mut summary = FeatureSummary::default();

    for (idx, area) in areas.iter().enumerate() {
        if idx > 0 {
            pause(job.area_delay);
        }
        progress.set_message(format!("Fetching {} for {}", job.kind.label(), area.name));

        let response = match source.fetch(job.kind, &area.bbox, job.split_quadrants) {
            Ok(response) => response,
            Err(e) => {
                log::warn!("Failed to fetch {} for {}: {}", job.kind.label(), area.name, e);
                summary.failed.push(area.name.clone());
                progress.inc(1);
                continue;
            }
        };

        let features = collect_features(&response, job.kind);
        if features.is_empty() {
            log::warn!("No {} found for {}", job.kind.label(), area.name);
            summary.empty.push(area.name.clone());
            progress.inc(1);
            continue;
        }

        let path = job.output_path(area);
        write_feature_collection(&path, &features)
            .with_context(|| format!("Failed to save {} for {}", job.kind.label(), area.name))?;
        log::info!(
            "Saved {} {} to {}",
            features.len(),
            job.kind.label(),
            path.display()
        );
        summary.written.push(path);
        progress.inc(1);
    }

    Ok(summary)
}
