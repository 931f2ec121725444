use chrono::{DateTime, Utc};

use crate::engine::core::segment::SegmentType;

/// Metadata filters for stashed-segment search. All present fields must
/// match (conjunction); `tags` requires every listed tag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilters {
    pub file_path: Option<String>,
    pub task_id: Option<String>,
    pub tags: Vec<String>,
    pub kind: Option<SegmentType>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

impl SearchFilters {
    /// True when no metadata dimension is constrained. Date bounds are
    /// applied after load and do not count here.
    pub fn is_metadata_empty(&self) -> bool {
        self.file_path.is_none()
            && self.task_id.is_none()
            && self.tags.is_empty()
            && self.kind.is_none()
    }
}
