//! Sequential download loops. One area (or stop) at a time, a fixed pause in
//! between, and a failed unit of work is logged and skipped.

pub mod dissolve;
pub mod features;
pub mod isochrones;

use std::thread;
use std::time::Duration;

use crate::api::{FetchError, GraphHopperClient, OverpassClient, OverpassResponse};
use crate::domain::{BBox, FeatureKind, TransitStop};

pub use dissolve::{dissolve_directory, dissolve_features};
pub use features::{FeatureJob, FeatureSummary, collect_features, run_feature_job};
pub use isochrones::{IsochroneJob, IsochroneSummary, run_isochrone_job};

/// Where area features come from
pub trait FeatureSource {
    fn fetch(&self, kind: FeatureKind, bbox: &BBox, split: bool)
    -> Result<OverpassResponse, FetchError>;
}

impl FeatureSource for OverpassClient {
    fn fetch(
        &self,
        kind: FeatureKind,
        bbox: &BBox,
        split: bool,
    ) -> Result<OverpassResponse, FetchError> {
        self.fetch_features(kind, bbox, split)
    }
}

/// Where stop isochrones come from
pub trait IsochroneSource {
    fn fetch(&self, stop: &TransitStop) -> Result<Vec<geojson::Feature>, FetchError>;
}

impl IsochroneSource for GraphHopperClient {
    fn fetch(&self, stop: &TransitStop) -> Result<Vec<geojson::Feature>, FetchError> {
        self.fetch_isochrones(stop)
    }
}

fn pause(delay: Duration) {
    if !delay.is_zero() {
        log::debug!("Sleeping {}s", delay.as_secs());
        thread::sleep(delay);
    }
}
