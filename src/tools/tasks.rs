use serde_json::{Value, json};

use crate::engine::AppState;
use crate::tools::params::{CreateTaskSnapshotParams, GetTaskContextParams, SetCurrentTaskParams};
use crate::tools::{ToolError, require_project};

/// Switch (or clear) the current task for a project.
pub fn set_current_task(state: &mut AppState, params: SetCurrentTaskParams) -> Result<Value, ToolError> {
    require_project(&params.project_id)?;

    let switch = state
        .context
        .set_current_task(&params.project_id, params.task_id.as_deref())?;

    Ok(json!({
        "previous_task_id": switch.previous_task_id,
        "current_task_id": switch.current_task_id,
        "working_set_updated": switch.working_set_updated,
    }))
}

/// All segments of a task (any tier) and whether that task is current.
pub fn get_task_context(state: &mut AppState, params: GetTaskContextParams) -> Result<Value, ToolError> {
    require_project(&params.project_id)?;

    let context = state
        .context
        .get_task_context(&params.project_id, params.task_id.as_deref())?;

    Ok(json!({
        "task_id": context.task_id,
        "segment_count": context.segment_count,
        "total_tokens": context.total_tokens,
        "active": context.active,
        "segments": context.segments,
    }))
}

/// Snapshot the task's segments into the stashed tier for later
/// retrieval.
pub fn create_task_snapshot(
    state: &mut AppState,
    params: CreateTaskSnapshotParams,
) -> Result<Value, ToolError> {
    require_project(&params.project_id)?;

    let snapshot = state.context.create_task_snapshot(
        &params.project_id,
        params.task_id.as_deref(),
        params.name.as_deref(),
    )?;

    Ok(json!({
        "snapshot_id": snapshot.snapshot_id,
        "task_id": snapshot.task_id,
        "segments_captured": snapshot.segments_captured,
        "tokens_captured": snapshot.tokens_captured,
        "created_at": snapshot.created_at,
    }))
}
