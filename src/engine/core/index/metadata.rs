use std::collections::{HashMap, HashSet};

use crate::engine::core::index::SearchFilters;
use crate::engine::core::segment::Segment;

/// Per-project metadata hash indexes: each maps a value to the set of
/// segment ids carrying it. Updated incrementally on stash, unstash,
/// delete, and update.
#[derive(Debug, Default)]
pub struct MetadataIndex {
    by_file: HashMap<String, HashSet<String>>,
    by_task: HashMap<String, HashSet<String>>,
    by_tag: HashMap<String, HashSet<String>>,
    by_type: HashMap<String, HashSet<String>>,
}

impl MetadataIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, segment: &Segment) {
        let id = &segment.segment_id;
        if let Some(file_path) = &segment.file_path {
            insert(&mut self.by_file, file_path, id);
        }
        if let Some(task_id) = &segment.task_id {
            insert(&mut self.by_task, task_id, id);
        }
        for tag in &segment.tags {
            insert(&mut self.by_tag, tag, id);
        }
        insert(&mut self.by_type, segment.kind.as_str(), id);
    }

    pub fn remove(&mut self, segment: &Segment) {
        let id = &segment.segment_id;
        if let Some(file_path) = &segment.file_path {
            discard(&mut self.by_file, file_path, id);
        }
        if let Some(task_id) = &segment.task_id {
            discard(&mut self.by_task, task_id, id);
        }
        for tag in &segment.tags {
            discard(&mut self.by_tag, tag, id);
        }
        discard(&mut self.by_type, segment.kind.as_str(), id);
    }

    /// Intersect candidate ids with every constrained dimension.
    pub fn apply(&self, mut candidates: HashSet<String>, filters: &SearchFilters) -> HashSet<String> {
        if let Some(file_path) = &filters.file_path {
            intersect(&mut candidates, self.by_file.get(file_path));
        }
        if let Some(task_id) = &filters.task_id {
            intersect(&mut candidates, self.by_task.get(task_id));
        }
        for tag in &filters.tags {
            intersect(&mut candidates, self.by_tag.get(tag));
        }
        if let Some(kind) = &filters.kind {
            intersect(&mut candidates, self.by_type.get(kind.as_str()));
        }
        candidates
    }

    pub fn is_empty(&self) -> bool {
        self.by_file.is_empty()
            && self.by_task.is_empty()
            && self.by_tag.is_empty()
            && self.by_type.is_empty()
    }
}

fn insert(index: &mut HashMap<String, HashSet<String>>, key: &str, id: &str) {
    index
        .entry(key.to_string())
        .or_default()
        .insert(id.to_string());
}

fn discard(index: &mut HashMap<String, HashSet<String>>, key: &str, id: &str) {
    if let Some(ids) = index.get_mut(key) {
        ids.remove(id);
        if ids.is_empty() {
            index.remove(key);
        }
    }
}

fn intersect(candidates: &mut HashSet<String>, ids: Option<&HashSet<String>>) {
    match ids {
        Some(ids) => candidates.retain(|id| ids.contains(id)),
        None => candidates.clear(),
    }
}
