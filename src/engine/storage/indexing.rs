use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::engine::core::index::{InvertedIndex, MetadataIndex, SearchFilters};
use crate::engine::core::segment::Segment;
use crate::engine::errors::StorageError;
use crate::engine::storage::shard::ShardFiles;

/// Derived index state over the stashed shards: a per-project inverted
/// keyword index plus per-project metadata hash indexes. Everything here
/// is reconstructible from disk (see `rebuild`).
#[derive(Debug)]
pub struct IndexingOps {
    enabled: bool,
    keyword: HashMap<String, InvertedIndex>,
    metadata: HashMap<String, MetadataIndex>,
}

impl IndexingOps {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            keyword: HashMap::new(),
            metadata: HashMap::new(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Index a stashed segment (keyword postings + metadata rows).
    pub fn add(&mut self, segment: &Segment, project_id: &str) {
        if self.enabled {
            self.keyword
                .entry(project_id.to_string())
                .or_default()
                .add(&segment.segment_id, &segment.text);
        }
        self.metadata
            .entry(project_id.to_string())
            .or_default()
            .add(segment);
    }

    /// Remove a segment's rows from both index families.
    pub fn remove(&mut self, segment: &Segment, project_id: &str) {
        if let Some(index) = self.keyword.get_mut(project_id) {
            index.remove(&segment.segment_id);
        }
        if let Some(index) = self.metadata.get_mut(project_id) {
            index.remove(segment);
        }
    }

    /// Keyword search. `None` means the query cannot be answered from the
    /// index (indexing disabled, or no index for the project) and the
    /// caller must fall back to scanning.
    pub fn keyword_search(&self, project_id: &str, query: &str) -> Option<HashSet<String>> {
        if !self.enabled {
            return None;
        }
        self.keyword.get(project_id).map(|index| index.search(query))
    }

    pub fn apply_filters(
        &self,
        project_id: &str,
        candidates: HashSet<String>,
        filters: &SearchFilters,
    ) -> HashSet<String> {
        if filters.is_metadata_empty() {
            return candidates;
        }
        match self.metadata.get(project_id) {
            Some(index) => index.apply(candidates, filters),
            None => candidates,
        }
    }

    /// Rebuild every per-project index from the stashed shards. Corrupted
    /// shards contribute nothing (they read as empty).
    pub fn rebuild(&mut self, files: &ShardFiles) -> Result<(), StorageError> {
        self.keyword.clear();
        self.metadata.clear();

        for project_id in files.list_projects() {
            let segments = match files.load_stashed(&project_id) {
                Ok(segments) => segments,
                Err(err) => {
                    warn!(
                        target: "ctxstash::storage",
                        project_id,
                        error = %err,
                        "skipping project during index rebuild"
                    );
                    continue;
                }
            };
            if self.enabled {
                // Touch the entry so an empty shard still gets an index.
                self.keyword.entry(project_id.clone()).or_default();
            }
            for segment in &segments {
                self.add(segment, &project_id);
            }
            debug!(
                target: "ctxstash::storage",
                project_id,
                segments = segments.len(),
                "rebuilt project indexes"
            );
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn keyword_index(&self, project_id: &str) -> Option<&InvertedIndex> {
        self.keyword.get(project_id)
    }

    #[cfg(test)]
    pub(crate) fn metadata_index(&self, project_id: &str) -> Option<&MetadataIndex> {
        self.metadata.get(project_id)
    }
}
