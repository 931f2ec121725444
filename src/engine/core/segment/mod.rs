pub mod model;

pub use model::{Generation, REF_TAG_PREFIX, Segment, SegmentType, Tier};
