pub mod segment_cache;

pub use segment_cache::SegmentCache;
