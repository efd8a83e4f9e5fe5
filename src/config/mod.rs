use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::api::RetryPolicy;

/// Settings read from `osmharvest.toml`. Every field has a default, so an
/// empty file (or no file at all) is a valid configuration.
#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub overpass: OverpassConfig,
    #[serde(default)]
    pub graphhopper: GraphHopperConfig,
    #[serde(default)]
    pub run: RunConfig,
}

fn default_overpass_urls() -> Vec<String> {
    vec![
        "https://overpass-api.de/api/interpreter".to_string(),
        "https://overpass.private.coffee/api/interpreter".to_string(),
        "https://maps.mail.ru/osm/tools/overpass/api/interpreter".to_string(),
    ]
}

fn default_overpass_timeout_secs() -> u64 {
    900
}

fn default_max_retries() -> u32 {
    3
}

fn default_overpass_retry_delay_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct OverpassConfig {
    #[serde(default = "default_overpass_urls")]
    pub urls: Vec<String>,
    /// Server-side query timeout; the HTTP client waits a little longer
    #[serde(default = "default_overpass_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_overpass_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            urls: default_overpass_urls(),
            timeout_secs: default_overpass_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_overpass_retry_delay_secs(),
        }
    }
}

impl OverpassConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_secs(self.retry_delay_secs))
    }
}

fn default_graphhopper_url() -> String {
    "https://graphhopper.com/api/1".to_string()
}

fn default_vehicle() -> String {
    "foot".to_string()
}

fn default_rate_limit_threshold() -> u32 {
    150
}

fn default_graphhopper_timeout_secs() -> u64 {
    60
}

fn default_graphhopper_retry_delay_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct GraphHopperConfig {
    #[serde(default = "default_graphhopper_url")]
    pub base_url: String,
    /// API keys, tried in order; rotation happens when one runs low
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default = "default_vehicle")]
    pub vehicle: String,
    #[serde(default = "default_rate_limit_threshold")]
    pub rate_limit_threshold: u32,
    #[serde(default = "default_graphhopper_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_graphhopper_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

impl Default for GraphHopperConfig {
    fn default() -> Self {
        Self {
            base_url: default_graphhopper_url(),
            keys: Vec::new(),
            vehicle: default_vehicle(),
            rate_limit_threshold: default_rate_limit_threshold(),
            timeout_secs: default_graphhopper_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_graphhopper_retry_delay_secs(),
        }
    }
}

impl GraphHopperConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_secs(self.retry_delay_secs))
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_name_field() -> String {
    "Name_EN".to_string()
}

fn default_area_delay_secs() -> u64 {
    15
}

fn default_stop_delay_secs() -> u64 {
    15
}

#[derive(Debug, Deserialize, Clone)]
pub struct RunConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Property holding the area name in the input file
    #[serde(default = "default_name_field")]
    pub name_field: String,
    /// Pause between areas, to stay friendly with public Overpass instances
    #[serde(default = "default_area_delay_secs")]
    pub area_delay_secs: u64,
    #[serde(default = "default_stop_delay_secs")]
    pub stop_delay_secs: u64,
    #[serde(default)]
    pub split_quadrants: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            name_field: default_name_field(),
            area_delay_secs: default_area_delay_secs(),
            stop_delay_secs: default_stop_delay_secs(),
            split_quadrants: false,
        }
    }
}

impl FileConfig {
    /// Load from an explicit path, or from the first config file found on
    /// the search path. No file at all gives the defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                bail!("Config file not found: {:?}", path);
            }
            return Self::from_file(path);
        }
        Ok(Self::load().unwrap_or_default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&contents).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn load() -> Option<Self> {
        for path in get_config_paths() {
            if path.exists()
                && let Ok(contents) = std::fs::read_to_string(&path)
            {
                match toml::from_str(&contents) {
                    Ok(config) => {
                        log::debug!("Loaded config from {:?}", path);
                        return Some(config);
                    }
                    Err(e) => {
                        log::warn!("Failed to parse config file {:?}: {}", path, e);
                    }
                }
            }
        }
        None
    }
}

fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    paths.push(PathBuf::from("osmharvest.toml"));
    paths.push(PathBuf::from(".osmharvest.toml"));

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("osmharvest").join("config.toml"));
        paths.push(config_dir.join("osmharvest.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".osmharvest.toml"));
        paths.push(home.join(".config").join("osmharvest").join("config.toml"));
    }

    paths
}
