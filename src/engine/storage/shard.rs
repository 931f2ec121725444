use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, warn};

use crate::engine::core::segment::Segment;
use crate::engine::errors::StorageError;

/// On-disk document holding all stashed segments of one project.
#[derive(Debug, Serialize, Deserialize, Default)]
struct ShardDoc {
    segments: Vec<Value>,
}

/// Shard file access for stashed segments: one JSON document per project,
/// written atomically via a `.tmp` sibling and `rename`. A shard that
/// fails to parse is quarantined as `.corrupt` and treated as empty.
#[derive(Debug, Clone)]
pub struct ShardFiles {
    stashed_dir: PathBuf,
}

impl ShardFiles {
    pub fn new(stashed_dir: PathBuf) -> Self {
        Self { stashed_dir }
    }

    pub fn shard_path(&self, project_id: &str) -> PathBuf {
        self.stashed_dir.join(format!("{project_id}.json"))
    }

    /// Raw shard entries for a project. Clears any stray `.tmp` from an
    /// interrupted write; a missing shard reads as empty.
    pub fn read_shard(&self, project_id: &str) -> Result<Vec<Value>, StorageError> {
        let path = self.shard_path(project_id);

        let tmp_path = tmp_path(&path);
        if tmp_path.exists() {
            warn!(
                target: "ctxstash::storage",
                path = %tmp_path.display(),
                "found incomplete write, removing"
            );
            if let Err(err) = fs::remove_file(&tmp_path) {
                error!(
                    target: "ctxstash::storage",
                    path = %tmp_path.display(),
                    error = %err,
                    "failed to remove temp file"
                );
            }
        }

        if !path.exists() {
            return Ok(Vec::new());
        }

        let raw = fs::read_to_string(&path).map_err(|err| StorageError::from_io(&path, err))?;
        match serde_json::from_str::<ShardDoc>(&raw) {
            Ok(doc) => Ok(doc.segments),
            Err(err) => {
                error!(
                    target: "ctxstash::storage",
                    path = %path.display(),
                    error = %err,
                    "corrupt shard, quarantining"
                );
                self.quarantine(&path);
                Ok(Vec::new())
            }
        }
    }

    /// Atomically replace a project's shard: write the full document to a
    /// `.tmp` sibling, sync, then rename over the shard. A reader sees
    /// either the old or the new content, never a partial write.
    pub fn write_shard(&self, project_id: &str, entries: &[Value]) -> Result<(), StorageError> {
        let path = self.shard_path(project_id);
        let tmp = tmp_path(&path);

        let result = (|| {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp)
                .map_err(|err| StorageError::from_io(&tmp, err))?;

            let doc = ShardDoc {
                segments: entries.to_vec(),
            };
            let payload = serde_json::to_vec_pretty(&doc)?;
            file.write_all(&payload)
                .map_err(|err| StorageError::from_io(&tmp, err))?;
            file.flush().map_err(|err| StorageError::from_io(&tmp, err))?;
            file.sync_all()
                .map_err(|err| StorageError::from_io(&tmp, err))?;

            fs::rename(&tmp, &path).map_err(|err| StorageError::from_io(&path, err))
        })();

        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result
    }

    /// All stashed segments of a project. Entries that fail to
    /// deserialize are skipped with a warning.
    pub fn load_stashed(&self, project_id: &str) -> Result<Vec<Segment>, StorageError> {
        let entries = self.read_shard(project_id)?;
        let mut segments = Vec::with_capacity(entries.len());
        for entry in entries {
            let id = entry_id(&entry).map(str::to_string);
            match serde_json::from_value::<Segment>(entry) {
                Ok(segment) => segments.push(segment),
                Err(err) => warn!(
                    target: "ctxstash::storage",
                    segment_id = id.as_deref().unwrap_or("?"),
                    error = %err,
                    "skipping undeserializable shard entry"
                ),
            }
        }
        Ok(segments)
    }

    pub fn stashed_ids(&self, project_id: &str) -> Result<HashSet<String>, StorageError> {
        let entries = self.read_shard(project_id)?;
        Ok(entries
            .iter()
            .filter_map(|entry| entry_id(entry).map(str::to_string))
            .collect())
    }

    /// Project ids present on disk, from `stashed/*.json`.
    pub fn list_projects(&self) -> Vec<String> {
        let pattern = self.stashed_dir.join("*.json");
        let Some(pattern) = pattern.to_str() else {
            return Vec::new();
        };
        let mut projects: Vec<String> = glob::glob(pattern)
            .map(|paths| {
                paths
                    .flatten()
                    .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
                    .collect()
            })
            .unwrap_or_default();
        projects.sort();
        projects
    }

    fn quarantine(&self, path: &Path) {
        let backup = path.with_extension("json.corrupt");
        if let Err(err) = fs::rename(path, &backup) {
            error!(
                target: "ctxstash::storage",
                original = %path.display(),
                backup = %backup.display(),
                error = %err,
                "failed to quarantine corrupt shard"
            );
        } else {
            warn!(
                target: "ctxstash::storage",
                backup = %backup.display(),
                "moved corrupt shard aside"
            );
        }
    }
}

/// Segment id of a raw shard entry, when present.
pub fn entry_id(entry: &Value) -> Option<&str> {
    entry.get("segment_id").and_then(Value::as_str)
}

fn tmp_path(shard: &Path) -> PathBuf {
    shard.with_extension("json.tmp")
}
