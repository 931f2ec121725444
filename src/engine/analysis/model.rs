use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::engine::core::segment::SegmentType;

/// Aggregate usage over a working set.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct UsageMetrics {
    pub total_tokens: u64,
    pub total_segments: usize,
    pub tokens_by_type: HashMap<SegmentType, u64>,
    pub segments_by_type: HashMap<SegmentType, usize>,
    pub tokens_by_task: HashMap<String, u64>,
    pub oldest_segment_age_hours: f64,
    pub newest_segment_age_hours: f64,
    pub pinned_segments_count: usize,
    pub pinned_tokens: u64,
    pub usage_percent: f64,
    pub estimated_remaining_tokens: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct HealthFactors {
    pub usage: f64,
    /// Contribution of segment age; zero or negative.
    pub age_penalty: f64,
    pub distribution: f64,
}

/// Context health on a 0–100 scale; higher is healthier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthScore {
    pub score: f64,
    pub usage_percent: f64,
    pub factors: HealthFactors,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendedAction {
    Prune,
    Stash,
    Unpin,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub priority: Priority,
    pub message: String,
    #[serde(default)]
    pub action: Option<RecommendedAction>,
}

/// Result of a full context analysis pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub total_tokens: u64,
    pub segment_count: usize,
    pub usage_percent: f64,
    pub health_score: HealthScore,
    pub recommendations: Vec<String>,
}
