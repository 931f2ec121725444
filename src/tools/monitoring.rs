use serde::Serialize;
use serde_json::{Value, json};
use std::collections::HashSet;

use crate::engine::AppState;
use crate::engine::core::segment::Segment;
use crate::tools::params::{AnalyzeUsageParams, GetWorkingSetParams};
use crate::tools::{ToolError, require_project};

#[derive(Debug, Serialize)]
struct SuggestedAction {
    tool: &'static str,
    description: &'static str,
    estimated_tokens_freed: u64,
}

/// Usage metrics, health score, recommendations, and pruning-candidate
/// count for a project, after ingesting any supplied descriptors.
pub fn analyze_usage(state: &mut AppState, params: AnalyzeUsageParams) -> Result<Value, ToolError> {
    require_project(&params.project_id)?;

    let had_descriptors = params.context_descriptors.is_some();
    let mut descriptors = params.context_descriptors.unwrap_or_default();
    if let Some(limit) = params.token_limit {
        descriptors.token_usage.limit = limit;
    } else if !had_descriptors {
        descriptors.token_usage.limit = state.settings.tokenizer.token_limit;
    }

    let analysis_result = state
        .context
        .analyze_context(&descriptors, &params.project_id)?;

    let all_segments = state.context.storage.load_all(&params.project_id)?;
    let mut working: Vec<Segment> = all_segments
        .into_iter()
        .filter(|s| s.tier.is_working())
        .collect();

    let token_limit = descriptors.token_usage.limit;
    let metrics = state.context.analysis.usage_metrics(&mut working, token_limit);
    let recommendations = state.context.analysis.recommendations(&metrics);

    // Candidate count over the working tier, with no a-priori roots.
    let candidates = state.context.gc.analyze_candidates(&working, &HashSet::new());
    let pruning_candidates_count = candidates.len();

    let mut warnings: Vec<String> = Vec::new();
    let mut suggested_actions: Vec<SuggestedAction> = Vec::new();
    let usage_percent = metrics.usage_percent;

    if usage_percent >= 90.0 {
        warnings.push(
            "URGENT: Context usage at 90%+ - prune immediately to avoid hitting limits".to_string(),
        );
        suggested_actions.push(SuggestedAction {
            tool: "context_gc_prune",
            description: "Prune old segments immediately",
            estimated_tokens_freed: (metrics.total_tokens as f64 * 0.3) as u64,
        });
    } else if usage_percent >= 80.0 {
        warnings.push("HIGH: Context usage at 80%+ - consider pruning to free space".to_string());
        suggested_actions.push(SuggestedAction {
            tool: "context_gc_analyze",
            description: "Analyze pruning candidates",
            estimated_tokens_freed: (metrics.total_tokens as f64 * 0.2) as u64,
        });
        suggested_actions.push(SuggestedAction {
            tool: "context_stash",
            description: "Stash old segments to free space",
            estimated_tokens_freed: (metrics.total_tokens as f64 * 0.15) as u64,
        });
    } else if usage_percent >= 60.0 {
        warnings.push(
            "WARNING: Context usage at 60%+ - monitor closely and consider stashing old segments"
                .to_string(),
        );
        suggested_actions.push(SuggestedAction {
            tool: "context_stash",
            description: "Stash old segments to free space",
            estimated_tokens_freed: (metrics.total_tokens as f64 * 0.1) as u64,
        });
    }

    let impact_summary = if pruning_candidates_count > 0 {
        let avg_tokens_per_segment = if metrics.total_segments > 0 {
            metrics.total_tokens as f64 / metrics.total_segments as f64
        } else {
            0.0
        };
        let estimated_tokens_freed = pruning_candidates_count as f64 * avg_tokens_per_segment;
        let estimated_usage_after = (usage_percent
            - estimated_tokens_freed / token_limit as f64 * 100.0)
            .max(0.0);
        json!({
            "pruning_candidates_count": pruning_candidates_count,
            "estimated_tokens_freed": estimated_tokens_freed as u64,
            "estimated_usage_after_pruning": (estimated_usage_after * 10.0).round() / 10.0,
        })
    } else {
        json!({})
    };

    Ok(json!({
        "usage_metrics": metrics,
        "health_score": analysis_result.health_score,
        "recommendations": recommendations,
        "warnings": warnings,
        "suggested_actions": suggested_actions,
        "impact_summary": impact_summary,
        "pruning_candidates_count": pruning_candidates_count,
    }))
}

/// The working set for a project (and optionally a task).
pub fn get_working_set(
    state: &mut AppState,
    params: GetWorkingSetParams,
) -> Result<Value, ToolError> {
    require_project(&params.project_id)?;

    let working_set = state
        .context
        .get_working_set(&params.project_id, params.task_id.as_deref())?;

    Ok(json!({
        "working_set": {
            "project_id": working_set.project_id,
            "task_id": working_set.task_id,
            "total_tokens": working_set.total_tokens,
            "last_updated": working_set.last_updated,
        },
        "segment_count": working_set.segments.len(),
        "total_tokens": working_set.total_tokens,
        "segments": working_set.segments,
    }))
}
