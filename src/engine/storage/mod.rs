pub mod indexing;
pub mod layer;
pub mod shard;

pub use indexing::IndexingOps;
pub use layer::StorageLayer;
pub use shard::ShardFiles;

#[cfg(test)]
mod layer_test;
#[cfg(test)]
mod shard_test;
