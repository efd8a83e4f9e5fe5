use std::cell::Cell;
use std::time::Duration;

use reqwest::header::HeaderMap;
use serde::Deserialize;

use super::overpass::truncate;
use super::{FetchError, RetryPolicy, USER_AGENT};
use crate::config::GraphHopperConfig;
use crate::domain::TransitStop;

const RATE_LIMIT_HEADER: &str = "x-ratelimit-remaining";

/// Isochrone API response; `polygons` are GeoJSON features
#[derive(Debug, Deserialize)]
pub struct IsochroneResponse {
    pub polygons: Vec<geojson::Feature>,
}

/// Remaining request budget reported by GraphHopper. A missing or garbled
/// header counts as exhausted.
pub fn rate_limit_remaining(headers: &HeaderMap) -> u32 {
    headers
        .get(RATE_LIMIT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

/// A failed request is blamed on the key when its budget is at or below the threshold
pub fn should_rotate(remaining: u32, threshold: u32) -> bool {
    remaining <= threshold
}

enum KeyOutcome {
    Accepted(Vec<geojson::Feature>),
    Rejected { status: u16, remaining: u32, body: String },
}

pub struct GraphHopperClient {
    client: reqwest::blocking::Client,
    base_url: String,
    keys: Vec<String>,
    vehicle: String,
    rate_limit_threshold: u32,
    retry: RetryPolicy,
    current_key: Cell<usize>,
}

impl GraphHopperClient {
    pub fn new(config: &GraphHopperConfig) -> anyhow::Result<Self> {
        use anyhow::Context;

        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            keys: config.keys.clone(),
            vehicle: config.vehicle.clone(),
            rate_limit_threshold: config.rate_limit_threshold,
            retry: config.retry_policy(),
            current_key: Cell::new(0),
        })
    }

    /// Walking isochrone polygons around a stop, sized by its railway kind
    pub fn fetch_isochrones(&self, stop: &TransitStop) -> Result<Vec<geojson::Feature>, FetchError> {
        if self.keys.is_empty() {
            return Err(FetchError::NotConfigured("GraphHopper API key"));
        }

        let what = format!("Isochrone for stop {}", stop.id);
        self.retry
            .run(&what, |_| self.try_keys(|key| self.request(key, stop)))
    }

    /// Try each key once, starting from the last one that worked
    fn try_keys(
        &self,
        mut request: impl FnMut(&str) -> Result<KeyOutcome, FetchError>,
    ) -> Result<Vec<geojson::Feature>, FetchError> {
        let start = self.current_key.get();

        for offset in 0..self.keys.len() {
            let idx = (start + offset) % self.keys.len();
            match request(&self.keys[idx])? {
                KeyOutcome::Accepted(polygons) => {
                    self.current_key.set(idx);
                    return Ok(polygons);
                }
                KeyOutcome::Rejected {
                    status,
                    remaining,
                    body,
                } => {
                    if !should_rotate(remaining, self.rate_limit_threshold) {
                        return Err(FetchError::Status {
                            service: "GraphHopper",
                            status,
                            body,
                        });
                    }
                    log::warn!(
                        "Switching API key #{} (status {}, {} requests left)",
                        idx + 1,
                        status,
                        remaining
                    );
                    self.current_key.set((idx + 1) % self.keys.len());
                }
            }
        }

        Err(FetchError::RateLimited {
            keys: self.keys.len(),
        })
    }

    fn request(&self, key: &str, stop: &TransitStop) -> Result<KeyOutcome, FetchError> {
        let url = format!("{}/isochrone", self.base_url);
        let transport = |source| FetchError::Transport {
            url: url.clone(),
            source,
        };

        let response = self
            .client
            .get(&url)
            .query(&[
                ("point", format!("{},{}", stop.lat, stop.lon)),
                ("time_limit", stop.railway.time_limit_secs().to_string()),
                ("vehicle", self.vehicle.clone()),
                ("key", key.to_string()),
            ])
            .send()
            .map_err(transport)?;

        let status = response.status();
        let remaining = rate_limit_remaining(response.headers());
        let body = response.text().map_err(transport)?;

        if status.as_u16() != 200 {
            return Ok(KeyOutcome::Rejected {
                status: status.as_u16(),
                remaining,
                body: truncate(&body, 300),
            });
        }

        log::debug!("Rate limit remaining: {}", remaining);
        let parsed: IsochroneResponse =
            serde_json::from_str(&body).map_err(|source| FetchError::Decode {
                service: "GraphHopper",
                source,
            })?;
        Ok(KeyOutcome::Accepted(parsed.polygons))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_rate_limit_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(rate_limit_remaining(&headers), 0);

        headers.insert(RATE_LIMIT_HEADER, HeaderValue::from_static("420"));
        assert_eq!(rate_limit_remaining(&headers), 420);

        headers.insert(RATE_LIMIT_HEADER, HeaderValue::from_static("lots"));
        assert_eq!(rate_limit_remaining(&headers), 0);
    }

    #[test]
    fn test_should_rotate() {
        assert!(should_rotate(0, 150));
        assert!(should_rotate(150, 150));
        assert!(!should_rotate(151, 150));
    }

    fn client(keys: &[&str]) -> GraphHopperClient {
        GraphHopperClient::new(&GraphHopperConfig {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            retry_delay_secs: 0,
            ..GraphHopperConfig::default()
        })
        .unwrap()
    }

    fn rejected(status: u16, remaining: u32) -> KeyOutcome {
        KeyOutcome::Rejected {
            status,
            remaining,
            body: String::new(),
        }
    }

    #[test]
    fn test_low_budget_key_is_rotated_away() {
        let client = client(&["first", "second"]);
        let mut tried = Vec::new();

        let polygons = client
            .try_keys(|key| {
                tried.push(key.to_string());
                Ok(match key {
                    "first" => rejected(429, 12),
                    _ => KeyOutcome::Accepted(Vec::new()),
                })
            })
            .unwrap();

        assert!(polygons.is_empty());
        assert_eq!(tried, vec!["first", "second"]);
    }

    #[test]
    fn test_working_key_is_kept_for_the_next_stop() {
        let client = client(&["first", "second"]);
        client
            .try_keys(|key| {
                Ok(match key {
                    "first" => rejected(429, 0),
                    _ => KeyOutcome::Accepted(Vec::new()),
                })
            })
            .unwrap();

        let mut tried = Vec::new();
        client
            .try_keys(|key| {
                tried.push(key.to_string());
                Ok(KeyOutcome::Accepted(Vec::new()))
            })
            .unwrap();

        assert_eq!(tried, vec!["second"]);
    }

    #[test]
    fn test_every_key_exhausted() {
        let client = client(&["first", "second", "third"]);
        let mut calls = 0;

        let result = client.try_keys(|_| {
            calls += 1;
            Ok(rejected(429, 150))
        });

        assert!(matches!(result, Err(FetchError::RateLimited { keys: 3 })));
        assert!(result.unwrap_err().is_retriable());
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_failure_with_budget_left_keeps_the_key() {
        let client = client(&["first", "second"]);
        let mut tried = Vec::new();

        let result = client.try_keys(|key| {
            tried.push(key.to_string());
            Ok(rejected(400, 900))
        });

        assert!(matches!(result, Err(FetchError::Status { status: 400, .. })));
        assert_eq!(tried, vec!["first"]);
        assert_eq!(client.current_key.get(), 0);
    }

    #[test]
    fn test_no_keys_configured() {
        let client = client(&[]);
        let stop = TransitStop {
            id: 1,
            railway: crate::domain::RailwayKind::Tram,
            lat: 52.4,
            lon: 16.9,
        };
        assert!(matches!(
            client.fetch_isochrones(&stop),
            Err(FetchError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_parse_isochrone_response() {
        let json = r#"{
            "polygons": [{
                "type": "Feature",
                "properties": {"bucket": 0},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[16.9, 52.4], [16.95, 52.4], [16.95, 52.45], [16.9, 52.4]]]
                }
            }],
            "info": {"copyrights": ["GraphHopper", "OpenStreetMap contributors"], "took": 12}
        }"#;

        let response: IsochroneResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.polygons.len(), 1);
        assert!(response.polygons[0].geometry.is_some());
    }
}
