use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::engine::core::cache::SegmentCache;
use crate::engine::core::index::SearchFilters;
use crate::engine::core::segment::{Segment, Tier};
use crate::engine::errors::StorageError;
use crate::engine::storage::indexing::IndexingOps;
use crate::engine::storage::shard::{ShardFiles, entry_id};
use crate::shared::time;

/// Tiered segment persistence: working-tier segments live in the LRU
/// cache (spilling to `evicted/`), stashed segments live in one JSON
/// shard per project under `stashed/`. Indexes are derived state and are
/// rebuilt from the shards on open.
pub struct StorageLayer {
    files: ShardFiles,
    cache: SegmentCache,
    working_ids: HashMap<String, HashSet<String>>,
    indexes: IndexingOps,
}

impl StorageLayer {
    pub fn open(
        root: &Path,
        max_active_segments: usize,
        enable_indexing: bool,
    ) -> Result<Self, StorageError> {
        let stashed_dir = root.join("stashed");
        let evicted_dir = root.join("evicted");
        fs::create_dir_all(&stashed_dir).map_err(|err| StorageError::from_io(&stashed_dir, err))?;
        fs::create_dir_all(&evicted_dir).map_err(|err| StorageError::from_io(&evicted_dir, err))?;

        let files = ShardFiles::new(stashed_dir);
        let mut indexes = IndexingOps::new(enable_indexing);
        indexes.rebuild(&files)?;

        Ok(Self {
            files,
            cache: SegmentCache::new(max_active_segments, evicted_dir),
            working_ids: HashMap::new(),
            indexes,
        })
    }

    /// Place a segment in working storage. Re-storing an id overwrites.
    pub fn store(&mut self, segment: Segment, project_id: &str) -> Result<(), StorageError> {
        let segment_id = segment.segment_id.clone();
        self.cache.put(segment)?;
        self.working_ids
            .entry(project_id.to_string())
            .or_default()
            .insert(segment_id);
        Ok(())
    }

    /// Every segment of a project, working and stashed. Order is
    /// unspecified.
    pub fn load_all(&mut self, project_id: &str) -> Result<Vec<Segment>, StorageError> {
        let mut segments = Vec::new();

        let working: Vec<String> = self
            .working_ids
            .get(project_id)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default();
        for segment_id in working {
            if let Some(segment) = self.cache.get(&segment_id) {
                segments.push(segment);
            }
        }

        segments.extend(self.files.load_stashed(project_id)?);
        Ok(segments)
    }

    /// Move a segment from working to stashed storage. Already-stashed
    /// ids are overwritten in place in the shard.
    pub fn stash(&mut self, mut segment: Segment, project_id: &str) -> Result<(), StorageError> {
        // Clear any spilled copy too: an id must never be on both sides
        // of the working/stashed divide.
        self.cache.delete(&segment.segment_id)?;
        if let Some(ids) = self.working_ids.get_mut(project_id) {
            ids.remove(&segment.segment_id);
        }

        segment.tier = Tier::Stashed;

        let mut entries = self.files.read_shard(project_id)?;
        entries.retain(|entry| entry_id(entry) != Some(segment.segment_id.as_str()));
        entries.push(serde_json::to_value(&segment)?);
        self.files.write_shard(project_id, &entries)?;

        self.indexes.add(&segment, project_id);
        debug!(
            target: "ctxstash::storage",
            segment_id = %segment.segment_id,
            project_id,
            "stashed segment"
        );
        Ok(())
    }

    /// Inverse of `stash`: drop the shard entry and return the segment to
    /// working storage.
    pub fn unstash(&mut self, mut segment: Segment, project_id: &str) -> Result<(), StorageError> {
        let mut entries = self.files.read_shard(project_id)?;
        entries.retain(|entry| entry_id(entry) != Some(segment.segment_id.as_str()));
        self.files.write_shard(project_id, &entries)?;

        self.indexes.remove(&segment, project_id);

        segment.tier = Tier::Working;
        segment.touch(time::now());
        self.store(segment, project_id)
    }

    /// Remove a segment from every tier and index. Missing ids are a
    /// no-op.
    pub fn delete(&mut self, segment_id: &str, project_id: &str) -> Result<(), StorageError> {
        self.cache.delete(segment_id)?;
        if let Some(ids) = self.working_ids.get_mut(project_id) {
            ids.remove(segment_id);
        }

        let entries = self.files.read_shard(project_id)?;
        let Some(removed) = entries
            .iter()
            .find(|entry| entry_id(entry) == Some(segment_id))
            .cloned()
        else {
            return Ok(());
        };

        let remaining: Vec<_> = entries
            .into_iter()
            .filter(|entry| entry_id(entry) != Some(segment_id))
            .collect();
        self.files.write_shard(project_id, &remaining)?;

        match serde_json::from_value::<Segment>(removed) {
            Ok(segment) => self.indexes.remove(&segment, project_id),
            Err(err) => warn!(
                target: "ctxstash::storage",
                segment_id,
                error = %err,
                "could not deserialize removed entry for index cleanup"
            ),
        }
        Ok(())
    }

    /// Replace a segment's record in whichever tier holds it. Working ids
    /// are replaced in the cache; stashed ids get their shard entry
    /// rewritten and their index rows rebuilt.
    pub fn update(&mut self, segment: Segment, project_id: &str) -> Result<(), StorageError> {
        if self.cache.get(&segment.segment_id).is_some() {
            self.cache.put(segment)?;
            return Ok(());
        }

        let mut entries = self.files.read_shard(project_id)?;
        let mut old_entry = None;
        for entry in entries.iter_mut() {
            if entry_id(entry) == Some(segment.segment_id.as_str()) {
                old_entry = Some(std::mem::replace(entry, serde_json::to_value(&segment)?));
                break;
            }
        }

        let Some(old_entry) = old_entry else {
            warn!(
                target: "ctxstash::storage",
                segment_id = %segment.segment_id,
                project_id,
                "segment not found for update"
            );
            return Ok(());
        };

        self.files.write_shard(project_id, &entries)?;

        match serde_json::from_value::<Segment>(old_entry) {
            Ok(old_segment) => self.indexes.remove(&old_segment, project_id),
            Err(err) => warn!(
                target: "ctxstash::storage",
                segment_id = %segment.segment_id,
                error = %err,
                "could not deserialize old entry for index cleanup"
            ),
        }
        self.indexes.add(&segment, project_id);
        Ok(())
    }

    /// Keyword + metadata search over a project's stashed segments.
    /// Date-range bounds are applied after load.
    pub fn search_stashed(
        &mut self,
        query: &str,
        filters: &SearchFilters,
        project_id: &str,
    ) -> Result<Vec<Segment>, StorageError> {
        let query = query.trim();

        let candidates = if query.is_empty() {
            self.files.stashed_ids(project_id)?
        } else {
            match self.indexes.keyword_search(project_id, query) {
                Some(hits) => hits,
                None => self.files.stashed_ids(project_id)?,
            }
        };

        let candidates = self.indexes.apply_filters(project_id, candidates, filters);

        let mut segments: Vec<Segment> = self
            .files
            .load_stashed(project_id)?
            .into_iter()
            .filter(|segment| candidates.contains(&segment.segment_id))
            .collect();

        // Without an inverted index the query degrades to a substring scan.
        if !query.is_empty() && !self.indexes.enabled() {
            let needle = query.to_lowercase();
            segments.retain(|segment| segment.text.to_lowercase().contains(&needle));
        }

        if let Some(after) = filters.created_after {
            segments.retain(|segment| segment.created_at >= after);
        }
        if let Some(before) = filters.created_before {
            segments.retain(|segment| segment.created_at <= before);
        }

        Ok(segments)
    }

    pub fn list_projects(&self) -> Vec<String> {
        self.files.list_projects()
    }

    pub fn shard_path(&self, project_id: &str) -> PathBuf {
        self.files.shard_path(project_id)
    }

    pub fn stashed_ids(&self, project_id: &str) -> Result<HashSet<String>, StorageError> {
        self.files.stashed_ids(project_id)
    }

    /// Working-tier ids tracked for a project (resident or spilled).
    pub fn working_ids(&self, project_id: &str) -> HashSet<String> {
        self.working_ids.get(project_id).cloned().unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn indexes(&self) -> &IndexingOps {
        &self.indexes
    }

    #[cfg(test)]
    pub(crate) fn cache(&self) -> &SegmentCache {
        &self.cache
    }
}
