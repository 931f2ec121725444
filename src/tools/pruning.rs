use chrono::Duration;
use serde_json::{Value, json};
use std::collections::HashSet;
use tracing::error;

use crate::engine::AppState;
use crate::engine::core::descriptor::ContextDescriptors;
use crate::engine::core::segment::{Segment, SegmentType};
use crate::shared::time;
use crate::tools::params::{GcAnalyzeParams, GcPinParams, GcPruneParams, GcUnpinParams, PruneAction};
use crate::tools::{ToolError, require_project};

/// Score pruning candidates for a project's working tier and, when a
/// token target is given, synthesize a stash/delete plan.
pub fn gc_analyze(state: &mut AppState, params: GcAnalyzeParams) -> Result<Value, ToolError> {
    require_project(&params.project_id)?;

    let all_segments = state.context.storage.load_all(&params.project_id)?;
    let working: Vec<Segment> = all_segments
        .into_iter()
        .filter(|s| s.tier.is_working())
        .collect();

    let roots = collect_roots(
        state,
        &working,
        params.context_descriptors.as_ref(),
        params.task_id.as_deref(),
    );

    let candidates = state.context.gc.analyze_candidates(&working, &roots);
    let estimated_tokens_freed: u64 = candidates.iter().map(|c| c.tokens).sum();

    let mut result = json!({
        "pruning_candidates": &candidates,
        "total_candidates": candidates.len(),
        "estimated_tokens_freed": estimated_tokens_freed,
    });

    if let Some(target_tokens) = params.target_tokens {
        let plan = state.context.gc.plan(&candidates, target_tokens);
        result["pruning_plan"] = serde_json::to_value(plan)
            .map_err(|err| ToolError::Internal(err.to_string()))?;
    }

    Ok(result)
}

/// Root set for an analysis pass: message segments of the active task,
/// segments of the currently open file, and recently created decisions.
fn collect_roots(
    state: &AppState,
    working: &[Segment],
    descriptors: Option<&ContextDescriptors>,
    task_id: Option<&str>,
) -> HashSet<String> {
    let mut roots = HashSet::new();
    let Some(descriptors) = descriptors else {
        return roots;
    };

    if !descriptors.recent_messages.is_empty() {
        if let Some(task_id) = task_id {
            roots.extend(
                working
                    .iter()
                    .filter(|s| {
                        s.kind == SegmentType::Message && s.task_id.as_deref() == Some(task_id)
                    })
                    .map(|s| s.segment_id.clone()),
            );
        }
    }

    if let Some(file) = &descriptors.current_file {
        roots.extend(
            working
                .iter()
                .filter(|s| s.file_path.as_deref() == Some(file.path.as_str()))
                .map(|s| s.segment_id.clone()),
        );
    }

    let decision_window = Duration::hours(state.context.gc.recent_decision_hours());
    let recent_threshold = time::now() - decision_window;
    roots.extend(
        working
            .iter()
            .filter(|s| s.kind == SegmentType::Decision && s.created_at > recent_threshold)
            .map(|s| s.segment_id.clone()),
    );

    roots
}

/// Execute a pruning action over the listed segments. Deletion is
/// irreversible and requires `confirm=true`. Pinned and missing ids are
/// per-item errors; a storage failure aborts the remaining items.
pub fn gc_prune(state: &mut AppState, params: GcPruneParams) -> Result<Value, ToolError> {
    require_project(&params.project_id)?;
    if params.segment_ids.is_empty() {
        return Err(ToolError::InvalidParameter(
            "segment_ids cannot be empty".to_string(),
        ));
    }
    if params.action == PruneAction::Delete && !params.confirm {
        return Err(ToolError::ConfirmationRequired(
            "confirm=true is required for delete actions".to_string(),
        ));
    }

    let all_segments = state.context.storage.load_all(&params.project_id)?;

    let mut to_prune: Vec<Segment> = Vec::new();
    let mut errors: Vec<String> = Vec::new();

    for segment_id in &params.segment_ids {
        let Some(segment) = all_segments.iter().find(|s| &s.segment_id == segment_id) else {
            errors.push(format!("Segment {segment_id} not found"));
            continue;
        };
        if segment.pinned {
            errors.push(format!("Segment {segment_id} is pinned and cannot be pruned"));
            continue;
        }
        if !segment.tier.is_working() {
            errors.push(format!(
                "Segment {segment_id} is not in working tier (tier: {})",
                segment.tier.as_str()
            ));
            continue;
        }
        to_prune.push(segment.clone());
    }

    let action_taken = match params.action {
        PruneAction::Stash => "stashed",
        PruneAction::Delete => "deleted",
    };

    let mut pruned_segments: Vec<String> = Vec::new();
    let mut tokens_freed: u64 = 0;

    for segment in to_prune {
        let segment_id = segment.segment_id.clone();
        let tokens = segment.tokens_or_zero();
        let outcome = match params.action {
            PruneAction::Stash => state.context.storage.stash(segment, &params.project_id),
            PruneAction::Delete => state
                .context
                .storage
                .delete(&segment_id, &params.project_id),
        };
        match outcome {
            Ok(()) => {
                pruned_segments.push(segment_id);
                tokens_freed += tokens;
            }
            Err(err) => {
                error!(
                    target: "ctxstash::tools",
                    segment_id = %segment_id,
                    error = %err,
                    "prune failed, aborting remaining items"
                );
                errors.push(format!("Failed to {action_taken} segment {segment_id}: {err}"));
                break;
            }
        }
    }

    state.context.invalidate(&params.project_id);

    Ok(json!({
        "pruned_segments": pruned_segments,
        "tokens_freed": tokens_freed,
        "action": action_taken,
        "errors": errors,
    }))
}

/// Pin segments so the GC engine never selects them.
pub fn gc_pin(state: &mut AppState, params: GcPinParams) -> Result<Value, ToolError> {
    let (pinned, errors) = set_pinned(state, &params.project_id, &params.segment_ids, true)?;
    Ok(json!({
        "pinned_segments": pinned,
        "errors": errors,
    }))
}

/// Remove the pin, making segments eligible for pruning again.
pub fn gc_unpin(state: &mut AppState, params: GcUnpinParams) -> Result<Value, ToolError> {
    let (unpinned, errors) = set_pinned(state, &params.project_id, &params.segment_ids, false)?;
    Ok(json!({
        "unpinned_segments": unpinned,
        "errors": errors,
    }))
}

fn set_pinned(
    state: &mut AppState,
    project_id: &str,
    segment_ids: &[String],
    pinned: bool,
) -> Result<(Vec<String>, Vec<String>), ToolError> {
    require_project(project_id)?;
    if segment_ids.is_empty() {
        return Err(ToolError::InvalidParameter(
            "segment_ids cannot be empty".to_string(),
        ));
    }

    let all_segments = state.context.storage.load_all(project_id)?;
    let mut updated: Vec<String> = Vec::new();
    let mut errors: Vec<String> = Vec::new();

    for segment_id in segment_ids {
        let Some(segment) = all_segments.iter().find(|s| &s.segment_id == segment_id) else {
            errors.push(format!("Segment {segment_id} not found"));
            continue;
        };

        let mut segment = segment.clone();
        segment.pinned = pinned;
        match state.context.storage.update(segment, project_id) {
            Ok(()) => updated.push(segment_id.clone()),
            Err(err) => {
                let verb = if pinned { "pin" } else { "unpin" };
                errors.push(format!("Failed to {verb} segment {segment_id}: {err}"));
            }
        }
    }

    Ok((updated, errors))
}
