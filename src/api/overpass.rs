use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use super::{FetchError, RetryPolicy, USER_AGENT};
use crate::config::OverpassConfig;
use crate::domain::{BBox, FeatureKind};

/// Raw Overpass API response
#[derive(Debug, Default, Deserialize)]
pub struct OverpassResponse {
    pub elements: Vec<Element>,
}

/// A single element from Overpass (node, way or relation)
#[derive(Debug, Deserialize)]
pub struct Element {
    #[serde(rename = "type")]
    pub type_: String,
    pub id: u64,
    #[serde(default)]
    pub nodes: Option<Vec<u64>>,
    #[serde(default)]
    pub members: Option<Vec<RelationMember>>,
    #[serde(default)]
    pub tags: Option<HashMap<String, String>>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

/// A relation member reference, as returned by `out body`
#[derive(Debug, Deserialize)]
pub struct RelationMember {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(rename = "ref")]
    pub ref_: u64,
    #[serde(default)]
    pub role: String,
}

impl OverpassResponse {
    /// Append elements from another response, skipping ones already present
    pub fn merge(&mut self, other: OverpassResponse) {
        let mut seen: HashSet<(String, u64)> = self
            .elements
            .iter()
            .map(|e| (e.type_.clone(), e.id))
            .collect();

        for element in other.elements {
            if seen.insert((element.type_.clone(), element.id)) {
                self.elements.push(element);
            }
        }
    }
}

/// Overpass QL for every way and relation matching `kind` inside `bbox`,
/// recursing down to member ways and nodes
pub fn build_query(kind: FeatureKind, bbox: &BBox, timeout_secs: u64) -> String {
    let bounds = bbox.to_overpass();
    let mut selectors = String::new();
    for filter in kind.filters() {
        let f = filter.to_overpass();
        selectors.push_str(&format!("  way{f}({bounds});\n  relation{f}({bounds});\n"));
    }

    format!("[out:json][timeout:{timeout_secs}];\n(\n{selectors});\n(._;>;);\nout body;")
}

pub struct OverpassClient {
    client: reqwest::blocking::Client,
    urls: Vec<String>,
    query_timeout_secs: u64,
    retry: RetryPolicy,
}

impl OverpassClient {
    pub fn new(config: &OverpassConfig) -> anyhow::Result<Self> {
        use anyhow::Context;

        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            // Client timeout slightly higher than the server-side query timeout
            .timeout(Duration::from_secs(config.timeout_secs + 30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            urls: config.urls.clone(),
            query_timeout_secs: config.timeout_secs,
            retry: config.retry_policy(),
        })
    }

    /// Fetch every `kind` element inside `bbox`
    ///
    /// With `split` set, the box is queried as four quadrants and the results
    /// merged, which keeps each query small enough for dense cities.
    pub fn fetch_features(
        &self,
        kind: FeatureKind,
        bbox: &BBox,
        split: bool,
    ) -> Result<OverpassResponse, FetchError> {
        if !split {
            return self.execute(&build_query(kind, bbox, self.query_timeout_secs));
        }

        let mut merged = OverpassResponse::default();
        for quadrant in bbox.quadrants() {
            let response = self.execute(&build_query(kind, &quadrant, self.query_timeout_secs))?;
            log::debug!("Quadrant {:?}: {} elements", quadrant, response.elements.len());
            merged.merge(response);
        }
        Ok(merged)
    }

    /// Execute a query, moving to the next mirror on every retry
    pub fn execute(&self, query: &str) -> Result<OverpassResponse, FetchError> {
        self.rotate_mirrors(|url| self.post(url, query))
    }

    fn rotate_mirrors(
        &self,
        mut send: impl FnMut(&str) -> Result<OverpassResponse, FetchError>,
    ) -> Result<OverpassResponse, FetchError> {
        if self.urls.is_empty() {
            return Err(FetchError::NotConfigured("Overpass URL"));
        }

        self.retry.run("Overpass query", |attempt| {
            let url = &self.urls[attempt as usize % self.urls.len()];
            log::debug!("Querying {} (attempt {})", url, attempt + 1);
            send(url)
        })
    }

    fn post(&self, url: &str, query: &str) -> Result<OverpassResponse, FetchError> {
        let transport = |source| FetchError::Transport {
            url: url.to_string(),
            source,
        };

        // Overpass expects form-encoded POST data: data=<query>
        let response = self
            .client
            .post(url)
            .form(&[("data", query)])
            .send()
            .map_err(transport)?;

        let status = response.status();
        let body = response.text().map_err(transport)?;

        if !status.is_success() {
            return Err(FetchError::Status {
                service: "Overpass",
                status: status.as_u16(),
                body: truncate(&body, 300),
            });
        }

        serde_json::from_str(&body).map_err(|source| FetchError::Decode {
            service: "Overpass",
            source,
        })
    }
}

pub(crate) fn truncate(body: &str, max_chars: usize) -> String {
    match body.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
