use crate::engine::storage::shard::ShardFiles;
use crate::test_helpers::factories::SegmentFactory;
use indoc::indoc;
use std::fs;
use tempfile::tempdir;

fn shard_files(dir: &tempfile::TempDir) -> ShardFiles {
    ShardFiles::new(dir.path().to_path_buf())
}

fn entry(id: &str) -> serde_json::Value {
    serde_json::to_value(SegmentFactory::new().with_id(id).stashed().create()).unwrap()
}

#[test]
fn test_missing_shard_reads_empty() {
    let dir = tempdir().unwrap();
    let files = shard_files(&dir);
    assert!(files.read_shard("ghost").unwrap().is_empty());
}

#[test]
fn test_write_then_read_round_trip() {
    let dir = tempdir().unwrap();
    let files = shard_files(&dir);

    files.write_shard("proj", &[entry("s1"), entry("s2")]).unwrap();

    let entries = files.read_shard("proj").unwrap();
    assert_eq!(entries.len(), 2);
    assert!(files.shard_path("proj").exists());
    assert!(!dir.path().join("proj.json.tmp").exists());
}

#[test]
fn test_stray_tmp_file_is_removed_on_read() {
    // Simulates a crash after the temp file was written but before the
    // rename: the original shard must survive intact.
    let dir = tempdir().unwrap();
    let files = shard_files(&dir);

    files.write_shard("proj", &[entry("s1")]).unwrap();
    fs::write(dir.path().join("proj.json.tmp"), b"{\"segments\": []}").unwrap();

    let entries = files.read_shard("proj").unwrap();
    assert_eq!(entries.len(), 1);
    assert!(!dir.path().join("proj.json.tmp").exists());
}

#[test]
fn test_corrupt_shard_is_quarantined_and_reads_empty() {
    let dir = tempdir().unwrap();
    let files = shard_files(&dir);

    fs::write(files.shard_path("proj"), "this is not json{{{").unwrap();

    assert!(files.read_shard("proj").unwrap().is_empty());
    assert!(!files.shard_path("proj").exists());
    assert!(dir.path().join("proj.json.corrupt").exists());

    // A fresh write proceeds normally afterwards.
    files.write_shard("proj", &[entry("s1")]).unwrap();
    assert_eq!(files.read_shard("proj").unwrap().len(), 1);
}

#[test]
fn test_undeserializable_entries_are_skipped() {
    let dir = tempdir().unwrap();
    let files = shard_files(&dir);

    let doc = indoc! {r#"
        {
          "segments": [
            {"segment_id": "broken"},
            {
              "segment_id": "ok",
              "text": "fine",
              "type": "note",
              "project_id": "proj",
              "created_at": "2026-01-01T00:00:00Z",
              "last_touched_at": "2026-01-01T00:00:00Z",
              "tier": "stashed"
            }
          ]
        }
    "#};
    fs::write(files.shard_path("proj"), doc).unwrap();

    let segments = files.load_stashed("proj").unwrap();
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].segment_id, "ok");

    // Raw ids still see both entries.
    assert_eq!(files.stashed_ids("proj").unwrap().len(), 2);
}

#[test]
fn test_list_projects_ignores_tmp_and_corrupt() {
    let dir = tempdir().unwrap();
    let files = shard_files(&dir);

    files.write_shard("alpha", &[entry("s1")]).unwrap();
    files.write_shard("beta", &[]).unwrap();
    fs::write(dir.path().join("gamma.json.tmp"), "{}").unwrap();
    fs::write(dir.path().join("delta.json.corrupt"), "junk").unwrap();

    assert_eq!(files.list_projects(), vec!["alpha", "beta"]);
}
