pub mod error;
pub mod graphhopper;
pub mod overpass;
pub mod retry;

pub use error::FetchError;
pub use graphhopper::GraphHopperClient;
pub use overpass::{OverpassClient, OverpassResponse};
pub use retry::RetryPolicy;

const USER_AGENT: &str = concat!("osmharvest/", env!("CARGO_PKG_VERSION"));
