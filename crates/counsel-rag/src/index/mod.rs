//! Partition index artifacts, in-memory indexes, and the process-wide cache

pub mod artifacts;
pub mod cache;

pub use artifacts::{ChunkRecord, PartitionIndex, VectorTable};
pub use cache::IndexLoader;
