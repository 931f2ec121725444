pub mod model;

pub use model::{
    ContextDescriptors, FileInfo, Message, MessageRole, SegmentSummary, TaskInfo, TokenUsage,
};
