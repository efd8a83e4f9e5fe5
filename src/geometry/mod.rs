pub mod assembler;
pub mod chain;
pub mod ring;

pub use assembler::{AssembledFeature, AssemblyError, assemble_element, into_geometry, union_all};
pub use chain::chain_segments;
