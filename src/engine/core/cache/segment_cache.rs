use lru::LruCache;
use std::collections::HashSet;
use std::fs;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use tracing::{debug, error, warn};

use crate::engine::core::segment::Segment;
use crate::engine::errors::StorageError;

/// Bounded in-memory cache of working-tier segments. When full, the
/// least-recently-used entry is spilled to `evicted/<id>.json` before the
/// new one is admitted; a spilled entry is reloaded transparently on the
/// next `get`. No eviction ever drops data without writing it first.
pub struct SegmentCache {
    cache: LruCache<String, Segment>,
    evicted: HashSet<String>,
    evicted_dir: PathBuf,
}

impl SegmentCache {
    pub fn new(capacity: usize, evicted_dir: PathBuf) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("nonzero capacity");
        Self {
            cache: LruCache::new(capacity),
            evicted: HashSet::new(),
            evicted_dir,
        }
    }

    /// Fetch a segment, promoting it to most-recently-used. A miss on an
    /// entry previously spilled to disk reloads and re-admits it.
    pub fn get(&mut self, segment_id: &str) -> Option<Segment> {
        if let Some(segment) = self.cache.get(segment_id) {
            return Some(segment.clone());
        }

        if self.evicted.contains(segment_id) {
            match self.load_evicted(segment_id) {
                Ok(Some(segment)) => {
                    if let Err(err) = self.put(segment.clone()) {
                        error!(
                            target: "ctxstash::cache",
                            segment_id,
                            error = %err,
                            "failed to re-admit evicted segment"
                        );
                    }
                    return Some(segment);
                }
                Ok(None) => {
                    warn!(target: "ctxstash::cache", segment_id, "evicted file missing");
                    self.evicted.remove(segment_id);
                }
                Err(err) => {
                    error!(
                        target: "ctxstash::cache",
                        segment_id,
                        error = %err,
                        "failed to load evicted segment"
                    );
                }
            }
        }

        None
    }

    /// Insert or refresh a segment. If the cache is at capacity and the id
    /// is new, the LRU-least entry is written to disk first.
    pub fn put(&mut self, segment: Segment) -> Result<(), StorageError> {
        let segment_id = segment.segment_id.clone();

        if !self.cache.contains(&segment_id) && self.cache.len() >= self.cache.cap().get() {
            if let Some((lru_id, lru_segment)) = self.cache.peek_lru() {
                let lru_id = lru_id.clone();
                self.save_evicted(&lru_id, lru_segment)?;
                self.cache.pop(&lru_id);
                self.evicted.insert(lru_id.clone());
                debug!(target: "ctxstash::cache", segment_id = %lru_id, "evicted to disk");
            }
        }

        self.cache.put(segment_id.clone(), segment);
        self.evicted.remove(&segment_id);
        Ok(())
    }

    /// Drop a segment from the cache and forget its evicted bit. The
    /// spilled file, if any, is left behind (see `delete`).
    pub fn remove(&mut self, segment_id: &str) {
        self.cache.pop(segment_id);
        self.evicted.remove(segment_id);
    }

    /// Remove a segment from the cache and delete its spilled file.
    pub fn delete(&mut self, segment_id: &str) -> Result<(), StorageError> {
        self.remove(segment_id);
        let path = self.evicted_path(segment_id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::from_io(&path, err)),
        }
    }

    pub fn contains(&self, segment_id: &str) -> bool {
        self.cache.contains(segment_id)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Ids currently tracked as spilled to disk.
    pub fn evicted_ids(&self) -> &HashSet<String> {
        &self.evicted
    }

    fn evicted_path(&self, segment_id: &str) -> PathBuf {
        self.evicted_dir.join(format!("{segment_id}.json"))
    }

    fn save_evicted(&self, segment_id: &str, segment: &Segment) -> Result<(), StorageError> {
        let path = self.evicted_path(segment_id);
        let payload = serde_json::to_vec_pretty(segment)?;
        fs::write(&path, payload).map_err(|err| StorageError::from_io(&path, err))
    }

    fn load_evicted(&self, segment_id: &str) -> Result<Option<Segment>, StorageError> {
        let path = self.evicted_path(segment_id);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StorageError::from_io(&path, err)),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }
}
