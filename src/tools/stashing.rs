use serde_json::{Value, json};
use tracing::error;

use crate::engine::AppState;
use crate::engine::core::segment::Segment;
use crate::tools::params::{RetrieveStashedParams, SearchStashedParams, StashParams};
use crate::tools::{ToolError, require_project};

/// Move working-tier segments into stashed storage.
pub fn stash(state: &mut AppState, params: StashParams) -> Result<Value, ToolError> {
    require_project(&params.project_id)?;
    if params.segment_ids.is_empty() {
        return Err(ToolError::InvalidParameter(
            "segment_ids cannot be empty".to_string(),
        ));
    }

    let result = state
        .context
        .stash_segments(&params.segment_ids, &params.project_id)?;

    Ok(json!({
        "stashed_segments": result.stashed_segments,
        "tokens_stashed": result.tokens_freed,
        "stash_location": result.stash_location,
        "errors": result.errors,
    }))
}

/// Keyword + metadata search over stashed segments, most recent first.
pub fn search_stashed(state: &mut AppState, params: SearchStashedParams) -> Result<Value, ToolError> {
    require_project(&params.project_id)?;

    let query = params.query.as_deref().unwrap_or("");
    let filter_params = params.filters.clone().unwrap_or_default();
    let filters = filter_params.to_filters()?;

    let mut segments = state
        .context
        .retrieve_stashed(query, &filters, &params.project_id)?;

    segments.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let total_matches = segments.len();
    let limit = params.limit.unwrap_or(50);
    if limit > 0 {
        segments.truncate(limit);
    }

    Ok(json!({
        "segments": segments,
        "total_matches": total_matches,
        "query": query,
        "filters_applied": filter_params,
    }))
}

/// Fetch stashed segments by id; optionally move them back to the
/// working tier.
pub fn retrieve_stashed(
    state: &mut AppState,
    params: RetrieveStashedParams,
) -> Result<Value, ToolError> {
    require_project(&params.project_id)?;
    if params.segment_ids.is_empty() {
        return Err(ToolError::InvalidParameter(
            "segment_ids cannot be empty".to_string(),
        ));
    }

    let all_segments = state.context.storage.load_all(&params.project_id)?;
    let to_retrieve: Vec<Segment> = all_segments
        .into_iter()
        .filter(|s| params.segment_ids.contains(&s.segment_id) && s.tier.is_stashed())
        .collect();

    let mut moved_ids: Vec<String> = Vec::new();
    let retrieved: Vec<Segment> = to_retrieve.clone();

    if params.move_to_active {
        for segment in to_retrieve {
            let segment_id = segment.segment_id.clone();
            match state.context.storage.unstash(segment, &params.project_id) {
                Ok(()) => moved_ids.push(segment_id),
                Err(err) => error!(
                    target: "ctxstash::tools",
                    segment_id = %segment_id,
                    error = %err,
                    "failed to move segment back to working tier"
                ),
            }
        }
        if !moved_ids.is_empty() {
            state.context.invalidate(&params.project_id);
        }
    }

    Ok(json!({
        "retrieved_segments": retrieved,
        "moved_to_active": moved_ids,
    }))
}

/// All project ids with stashed storage on disk.
pub fn list_projects(state: &mut AppState) -> Result<Value, ToolError> {
    let projects = state.context.storage.list_projects();
    Ok(json!({
        "count": projects.len(),
        "projects": projects,
    }))
}
