pub mod cache;
pub mod descriptor;
pub mod index;
pub mod segment;
pub mod tokenizer;

pub use cache::SegmentCache;
pub use descriptor::{
    ContextDescriptors, FileInfo, Message, MessageRole, SegmentSummary, TaskInfo, TokenUsage,
};
pub use index::{InvertedIndex, MetadataIndex, SearchFilters};
pub use segment::{Generation, Segment, SegmentType, Tier};
pub use tokenizer::Tokenizer;
