pub mod checkpoint;
pub mod collection;

pub use checkpoint::{Checkpoint, CheckpointError};
pub use collection::{to_feature, write_feature_collection};
