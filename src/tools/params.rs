use serde::{Deserialize, Serialize};

use crate::engine::core::descriptor::ContextDescriptors;
use crate::engine::core::index::SearchFilters;
use crate::engine::core::segment::SegmentType;
use crate::shared::time;
use crate::tools::ToolError;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct AnalyzeUsageParams {
    pub context_descriptors: Option<ContextDescriptors>,
    pub project_id: String,
    pub task_id: Option<String>,
    pub token_limit: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct GetWorkingSetParams {
    pub project_id: String,
    pub task_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct StashParams {
    pub project_id: String,
    pub segment_ids: Vec<String>,
}

/// Wire form of search filters; date bounds arrive as strings and are
/// parsed into instants by `to_filters`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FilterParams {
    pub file_path: Option<String>,
    pub task_id: Option<String>,
    pub tags: Vec<String>,
    #[serde(rename = "type")]
    pub kind: Option<SegmentType>,
    pub created_after: Option<String>,
    pub created_before: Option<String>,
}

impl FilterParams {
    pub fn to_filters(&self) -> Result<SearchFilters, ToolError> {
        let created_after = self
            .created_after
            .as_deref()
            .map(|raw| {
                time::parse_timestamp(raw).ok_or_else(|| {
                    ToolError::InvalidParameter(format!("invalid created_after datetime: {raw}"))
                })
            })
            .transpose()?;
        let created_before = self
            .created_before
            .as_deref()
            .map(|raw| {
                time::parse_timestamp(raw).ok_or_else(|| {
                    ToolError::InvalidParameter(format!("invalid created_before datetime: {raw}"))
                })
            })
            .transpose()?;

        Ok(SearchFilters {
            file_path: self.file_path.clone(),
            task_id: self.task_id.clone(),
            tags: self.tags.clone(),
            kind: self.kind,
            created_after,
            created_before,
        })
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct SearchStashedParams {
    pub project_id: String,
    pub query: Option<String>,
    pub filters: Option<FilterParams>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct RetrieveStashedParams {
    pub project_id: String,
    pub segment_ids: Vec<String>,
    pub move_to_active: bool,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct GcAnalyzeParams {
    pub context_descriptors: Option<ContextDescriptors>,
    pub project_id: String,
    pub task_id: Option<String>,
    pub target_tokens: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PruneAction {
    Stash,
    Delete,
}

#[derive(Debug, Deserialize)]
pub struct GcPruneParams {
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub segment_ids: Vec<String>,
    pub action: PruneAction,
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct GcPinParams {
    pub project_id: String,
    pub segment_ids: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct GcUnpinParams {
    pub project_id: String,
    pub segment_ids: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct SetCurrentTaskParams {
    pub project_id: String,
    pub task_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct GetTaskContextParams {
    pub project_id: String,
    pub task_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct CreateTaskSnapshotParams {
    pub project_id: String,
    pub task_id: Option<String>,
    pub name: Option<String>,
}
