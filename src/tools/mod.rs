pub mod error;
pub mod monitoring;
pub mod params;
pub mod pruning;
pub mod stashing;
pub mod tasks;

pub use error::ToolError;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::engine::AppState;

/// Route a tool call to its handler. Failures come back as the standard
/// `{"error": {code, message, details}}` envelope.
pub fn dispatch(state: &mut AppState, tool: &str, params: Value) -> Value {
    debug!(target: "ctxstash::tools", tool, "dispatching tool call");
    match route(state, tool, params) {
        Ok(value) => value,
        Err(err) => err.to_response(),
    }
}

fn route(state: &mut AppState, tool: &str, params: Value) -> Result<Value, ToolError> {
    match tool {
        "context_analyze_usage" => monitoring::analyze_usage(state, parse(params)?),
        "context_get_working_set" => monitoring::get_working_set(state, parse(params)?),
        "context_stash" => stashing::stash(state, parse(params)?),
        "context_search_stashed" => stashing::search_stashed(state, parse(params)?),
        "context_retrieve_stashed" => stashing::retrieve_stashed(state, parse(params)?),
        "context_list_projects" => stashing::list_projects(state),
        "context_gc_analyze" => pruning::gc_analyze(state, parse(params)?),
        "context_gc_prune" => pruning::gc_prune(state, parse(params)?),
        "context_gc_pin" => pruning::gc_pin(state, parse(params)?),
        "context_gc_unpin" => pruning::gc_unpin(state, parse(params)?),
        "context_set_current_task" => tasks::set_current_task(state, parse(params)?),
        "context_get_task_context" => tasks::get_task_context(state, parse(params)?),
        "context_create_task_snapshot" => tasks::create_task_snapshot(state, parse(params)?),
        _ => Err(ToolError::InvalidParameter(format!("unknown tool: {tool}"))),
    }
}

fn parse<T: DeserializeOwned>(params: Value) -> Result<T, ToolError> {
    serde_json::from_value(params)
        .map_err(|err| ToolError::InvalidParameter(format!("invalid parameters: {err}")))
}

/// Common guard shared by every handler that takes a project id.
pub(crate) fn require_project(project_id: &str) -> Result<(), ToolError> {
    if project_id.is_empty() {
        return Err(ToolError::InvalidParameter(
            "project_id is required".to_string(),
        ));
    }
    Ok(())
}
