use serde::{Deserialize, Serialize};

use crate::engine::core::segment::SegmentType;

/// One unreachable, unpinned segment with its prune score.
/// Higher scores are more prune-worthy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PruneCandidate {
    pub segment_id: String,
    pub score: f64,
    pub tokens: u64,
    pub reason: String,
    pub segment_type: SegmentType,
    pub age_hours: f64,
}

/// A synthesized plan: which candidates to delete, which to stash, and
/// what that frees.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrunePlan {
    /// Every candidate considered, sorted by descending score.
    pub candidates: Vec<PruneCandidate>,
    pub total_tokens_freed: u64,
    pub stash_segments: Vec<String>,
    pub delete_segments: Vec<String>,
    pub reason: String,
}
