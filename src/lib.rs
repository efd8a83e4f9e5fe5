//! osmharvest - Download OpenStreetMap buildings, water bodies and transit isochrones into GeoJSON

pub mod api;
pub mod config;
pub mod domain;
pub mod geometry;
pub mod input;
pub mod osm;
pub mod output;
pub mod pipeline;
