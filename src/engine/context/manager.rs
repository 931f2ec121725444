use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::engine::analysis::AnalysisEngine;
use crate::engine::analysis::model::AnalysisResult;
use crate::engine::context::model::{StashResult, TaskContext, TaskSnapshot, TaskSwitch, WorkingSet};
use crate::engine::core::descriptor::ContextDescriptors;
use crate::engine::core::index::SearchFilters;
use crate::engine::core::segment::{Segment, SegmentType, Tier};
use crate::engine::core::tokenizer::Tokenizer;
use crate::engine::errors::ContextError;
use crate::engine::gc::GcEngine;
use crate::engine::storage::StorageLayer;
use crate::shared::time;

/// Orchestrates the storage, analysis, and GC components: converts
/// platform descriptors into segments, scopes state by project and task,
/// and serves working sets and stashed queries.
pub struct ContextManager {
    pub storage: StorageLayer,
    pub gc: GcEngine,
    pub analysis: AnalysisEngine,
    tokenizer: Arc<Tokenizer>,

    /// project_id -> current task id.
    current_tasks: HashMap<String, String>,
    /// project_id -> task id -> cached working set.
    working_sets: HashMap<String, HashMap<Option<String>, WorkingSet>>,
}

impl ContextManager {
    pub fn new(
        storage: StorageLayer,
        gc: GcEngine,
        analysis: AnalysisEngine,
        tokenizer: Arc<Tokenizer>,
    ) -> Self {
        Self {
            storage,
            gc,
            analysis,
            tokenizer,
            current_tasks: HashMap::new(),
            working_sets: HashMap::new(),
        }
    }

    /// Ingest descriptors, then compute metrics, health, and
    /// recommendations over the project's working tier.
    pub fn analyze_context(
        &mut self,
        descriptors: &ContextDescriptors,
        project_id: &str,
    ) -> Result<AnalysisResult, ContextError> {
        validate_project_id(project_id)?;

        let new_segments = self.convert_descriptors(descriptors, project_id);
        for segment in new_segments {
            self.storage.store(segment, project_id)?;
        }

        let all_segments = self.storage.load_all(project_id)?;
        let mut working: Vec<Segment> = all_segments
            .into_iter()
            .filter(|s| s.tier.is_working())
            .collect();

        let token_limit = descriptors.token_usage.limit;
        let metrics = self.analysis.usage_metrics(&mut working, token_limit);
        let health_score = self.analysis.health_score(&mut working, token_limit);
        let recommendations = self
            .analysis
            .recommendations(&metrics)
            .into_iter()
            .map(|r| r.message)
            .collect();

        if let Some(task_info) = &descriptors.task_info {
            self.current_tasks
                .insert(project_id.to_string(), task_info.task_id.clone());
        }
        self.invalidate(project_id);

        Ok(AnalysisResult {
            total_tokens: metrics.total_tokens,
            segment_count: metrics.total_segments,
            usage_percent: metrics.usage_percent,
            health_score,
            recommendations,
        })
    }

    /// Working set for a (project, task?) pair, rebuilt lazily from
    /// storage and cached until the project is next mutated.
    pub fn get_working_set(
        &mut self,
        project_id: &str,
        task_id: Option<&str>,
    ) -> Result<WorkingSet, ContextError> {
        validate_project_id(project_id)?;

        let effective_task_id = task_id
            .map(str::to_string)
            .or_else(|| self.current_tasks.get(project_id).cloned());

        if let Some(cached) = self
            .working_sets
            .get(project_id)
            .and_then(|by_task| by_task.get(&effective_task_id))
        {
            return Ok(cached.clone());
        }

        let all_segments = self.storage.load_all(project_id)?;
        let mut segments: Vec<Segment> = all_segments
            .into_iter()
            .filter(|s| s.tier.is_working())
            .collect();

        if let Some(task_id) = &effective_task_id {
            segments.retain(|s| s.task_id.as_deref() == Some(task_id.as_str()));
        }

        segments.sort_by(|a, b| b.last_touched_at.cmp(&a.last_touched_at));
        let total_tokens = segments.iter().map(Segment::tokens_or_zero).sum();

        let working_set = WorkingSet {
            segments,
            total_tokens,
            project_id: project_id.to_string(),
            task_id: effective_task_id.clone(),
            last_updated: time::now(),
        };

        self.working_sets
            .entry(project_id.to_string())
            .or_default()
            .insert(effective_task_id, working_set.clone());

        Ok(working_set)
    }

    /// Stash the listed working-tier segments. Missing ids are logged and
    /// skipped; a storage failure stops the remaining items and the
    /// partial result is returned.
    pub fn stash_segments(
        &mut self,
        segment_ids: &[String],
        project_id: &str,
    ) -> Result<StashResult, ContextError> {
        validate_project_id(project_id)?;
        if segment_ids.is_empty() {
            return Ok(StashResult {
                stashed_segments: Vec::new(),
                tokens_freed: 0,
                stash_location: None,
                errors: Vec::new(),
            });
        }

        let all_segments = self.storage.load_all(project_id)?;
        let to_stash: Vec<Segment> = all_segments
            .into_iter()
            .filter(|s| segment_ids.contains(&s.segment_id) && s.tier.is_working())
            .collect();

        let found: Vec<&str> = to_stash.iter().map(|s| s.segment_id.as_str()).collect();
        let missing: Vec<&String> = segment_ids
            .iter()
            .filter(|id| !found.contains(&id.as_str()))
            .collect();
        if !missing.is_empty() {
            warn!(
                target: "ctxstash::context",
                project_id,
                ?missing,
                "segments not found or not in working tier"
            );
        }

        let mut stashed_ids: Vec<String> = Vec::new();
        let mut tokens_freed: u64 = 0;
        let mut errors: Vec<String> = Vec::new();

        for segment in to_stash {
            let segment_id = segment.segment_id.clone();
            let tokens = segment.tokens_or_zero();
            match self.storage.stash(segment, project_id) {
                Ok(()) => {
                    stashed_ids.push(segment_id);
                    tokens_freed += tokens;
                }
                Err(err) => {
                    error!(
                        target: "ctxstash::context",
                        segment_id = %segment_id,
                        error = %err,
                        "stash failed, aborting remaining items"
                    );
                    errors.push(format!("failed to stash {segment_id}: {err}"));
                    break;
                }
            }
        }

        self.invalidate(project_id);

        Ok(StashResult {
            stashed_segments: stashed_ids,
            tokens_freed,
            stash_location: Some(self.storage.shard_path(project_id)),
            errors,
        })
    }

    /// Keyword/metadata search over the project's stashed segments.
    pub fn retrieve_stashed(
        &mut self,
        query: &str,
        filters: &SearchFilters,
        project_id: &str,
    ) -> Result<Vec<Segment>, ContextError> {
        validate_project_id(project_id)?;
        Ok(self.storage.search_stashed(query, filters, project_id)?)
    }

    pub fn current_task(&self, project_id: &str) -> Option<String> {
        self.current_tasks.get(project_id).cloned()
    }

    /// Switch (or clear) the project's current task and rebuild its
    /// working set.
    pub fn set_current_task(
        &mut self,
        project_id: &str,
        task_id: Option<&str>,
    ) -> Result<TaskSwitch, ContextError> {
        validate_project_id(project_id)?;

        let previous_task_id = self.current_tasks.get(project_id).cloned();
        match task_id {
            Some(task_id) => {
                self.current_tasks
                    .insert(project_id.to_string(), task_id.to_string());
            }
            None => {
                self.current_tasks.remove(project_id);
            }
        }

        self.invalidate(project_id);
        let working_set_updated = self.get_working_set(project_id, task_id).is_ok();

        Ok(TaskSwitch {
            previous_task_id,
            current_task_id: task_id.map(str::to_string),
            working_set_updated,
        })
    }

    /// Every segment of a task, across tiers, plus whether that task is
    /// current.
    pub fn get_task_context(
        &mut self,
        project_id: &str,
        task_id: Option<&str>,
    ) -> Result<TaskContext, ContextError> {
        validate_project_id(project_id)?;

        let effective_task_id = task_id
            .map(str::to_string)
            .or_else(|| self.current_tasks.get(project_id).cloned());

        let Some(effective_task_id) = effective_task_id else {
            return Ok(TaskContext {
                task_id: None,
                segments: Vec::new(),
                total_tokens: 0,
                segment_count: 0,
                active: false,
            });
        };

        let all_segments = self.storage.load_all(project_id)?;
        let segments: Vec<Segment> = all_segments
            .into_iter()
            .filter(|s| s.task_id.as_deref() == Some(effective_task_id.as_str()))
            .collect();

        let total_tokens = segments.iter().map(Segment::tokens_or_zero).sum();
        let active = self.current_tasks.get(project_id) == Some(&effective_task_id);

        Ok(TaskContext {
            segment_count: segments.len(),
            task_id: Some(effective_task_id),
            segments,
            total_tokens,
            active,
        })
    }

    /// Copy the task's segments into the stashed tier under derived ids,
    /// tagged with the snapshot id (and name, when given).
    pub fn create_task_snapshot(
        &mut self,
        project_id: &str,
        task_id: Option<&str>,
        name: Option<&str>,
    ) -> Result<TaskSnapshot, ContextError> {
        validate_project_id(project_id)?;

        let effective_task_id = task_id
            .map(str::to_string)
            .or_else(|| self.current_tasks.get(project_id).cloned())
            .ok_or(ContextError::NoCurrentTask)?;

        let task_context = self.get_task_context(project_id, Some(&effective_task_id))?;

        let now = time::now();
        let snapshot_id = format!(
            "snapshot-{project_id}-{effective_task_id}-{}",
            now.timestamp_micros()
        );

        let mut segments_captured = 0;
        let mut tokens_captured: u64 = 0;

        for segment in task_context.segments {
            let mut tags = segment.tags.clone();
            tags.push("snapshot".to_string());
            tags.push(snapshot_id.clone());
            if let Some(name) = name {
                tags.push(name.to_string());
            }

            let copy = Segment {
                segment_id: format!("{}-{snapshot_id}", segment.segment_id),
                last_touched_at: now,
                tags,
                tier: Tier::Stashed,
                ..segment
            };

            tokens_captured += copy.tokens_or_zero();
            self.storage.stash(copy, project_id)?;
            segments_captured += 1;
        }

        debug!(
            target: "ctxstash::context",
            snapshot_id,
            segments_captured,
            "created task snapshot"
        );

        Ok(TaskSnapshot {
            snapshot_id,
            task_id: effective_task_id,
            segments_captured,
            tokens_captured,
            created_at: now,
        })
    }

    /// Drop every cached working set of a project. Called after any
    /// mutation that can change tier membership.
    pub fn invalidate(&mut self, project_id: &str) {
        if let Some(by_task) = self.working_sets.get_mut(project_id) {
            by_task.clear();
        }
    }

    /// Build segments out of platform descriptors: one `message` segment
    /// per recent message, one `code` segment for the open file, and one
    /// placeholder per non-summary segment summary.
    fn convert_descriptors(
        &self,
        descriptors: &ContextDescriptors,
        project_id: &str,
    ) -> Vec<Segment> {
        let now = time::now();
        let ts = now.timestamp_micros();
        let task_id = descriptors
            .task_info
            .as_ref()
            .map(|info| info.task_id.clone());

        let mut segments: Vec<Segment> = Vec::new();

        for (i, message) in descriptors.recent_messages.iter().enumerate() {
            let text = format!("{}: {}", message.role.as_str(), message.content);
            let tokens = self.tokenizer.count(&text);
            let created_at = message.timestamp.unwrap_or(now);

            segments.push(Segment {
                segment_id: format!("msg-{project_id}-{ts}-{i}"),
                text,
                kind: SegmentType::Message,
                project_id: project_id.to_string(),
                task_id: task_id.clone(),
                created_at,
                last_touched_at: created_at,
                pinned: false,
                generation: Default::default(),
                gc_survival_count: 0,
                refcount: 0,
                file_path: None,
                line_range: None,
                tags: Vec::new(),
                topic_id: None,
                tokens: Some(tokens),
                tokens_computed_at: None,
                text_hash: None,
                tier: Tier::Working,
            });
        }

        if let Some(file) = &descriptors.current_file {
            let mut text = format!("File: {}", file.path);
            if let Some(line) = file.current_line {
                text.push_str(&format!(" (line {line})"));
            }
            let tokens = self.tokenizer.count(&text);

            segments.push(Segment {
                segment_id: format!("file-{project_id}-{ts}"),
                text,
                kind: SegmentType::Code,
                project_id: project_id.to_string(),
                task_id: task_id.clone(),
                created_at: now,
                last_touched_at: now,
                pinned: false,
                generation: Default::default(),
                gc_survival_count: 0,
                refcount: 0,
                file_path: Some(file.path.clone()),
                line_range: file.current_line.map(|line| (line, line)),
                tags: Vec::new(),
                topic_id: None,
                tokens: Some(tokens),
                tokens_computed_at: None,
                text_hash: None,
                tier: Tier::Working,
            });
        }

        for summary in &descriptors.segment_summaries {
            // Summaries of type `summary` describe segments that already
            // exist elsewhere; only the rest become placeholders.
            if summary.kind == SegmentType::Summary {
                continue;
            }

            segments.push(Segment {
                segment_id: summary.segment_id.clone(),
                text: summary.preview.clone(),
                kind: summary.kind,
                project_id: project_id.to_string(),
                task_id: task_id.clone(),
                created_at: summary.created_at,
                last_touched_at: summary.created_at,
                pinned: false,
                generation: Default::default(),
                gc_survival_count: 0,
                refcount: 0,
                file_path: None,
                line_range: None,
                tags: Vec::new(),
                topic_id: None,
                tokens: Some(summary.tokens),
                tokens_computed_at: None,
                text_hash: None,
                tier: Tier::Working,
            });
        }

        segments
    }
}

fn validate_project_id(project_id: &str) -> Result<(), ContextError> {
    if project_id.is_empty() {
        return Err(ContextError::InvalidParameter(
            "project_id cannot be empty".to_string(),
        ));
    }
    Ok(())
}
