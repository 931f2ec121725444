use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::engine::core::segment::Segment;

/// The working-tier segments for a (project, task?) pair, most recently
/// touched first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkingSet {
    pub segments: Vec<Segment>,
    pub total_tokens: u64,
    pub project_id: String,
    pub task_id: Option<String>,
    pub last_updated: DateTime<Utc>,
}

/// Outcome of a stash batch. A storage failure mid-batch stops the
/// remaining items; what succeeded is still reported here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StashResult {
    pub stashed_segments: Vec<String>,
    pub tokens_freed: u64,
    pub stash_location: Option<PathBuf>,
    pub errors: Vec<String>,
}

/// All segments of one task, across tiers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskContext {
    pub task_id: Option<String>,
    pub segments: Vec<Segment>,
    pub total_tokens: u64,
    pub segment_count: usize,
    /// Whether this is the project's current task.
    pub active: bool,
}

/// Outcome of switching the current task of a project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskSwitch {
    pub previous_task_id: Option<String>,
    pub current_task_id: Option<String>,
    pub working_set_updated: bool,
}

/// Outcome of snapshotting a task into the stashed tier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskSnapshot {
    pub snapshot_id: String,
    pub task_id: String,
    pub segments_captured: usize,
    pub tokens_captured: u64,
    pub created_at: DateTime<Utc>,
}
