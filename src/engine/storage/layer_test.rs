use std::collections::HashSet;

use crate::engine::core::index::SearchFilters;
use crate::engine::storage::StorageLayer;
use crate::test_helpers::factories::SegmentFactory;
use tempfile::tempdir;

fn open(dir: &tempfile::TempDir) -> StorageLayer {
    StorageLayer::open(dir.path(), 100, true).unwrap()
}

#[test]
fn test_store_then_load_all() {
    crate::logging::init_for_tests();
    let dir = tempdir().unwrap();
    let mut storage = open(&dir);

    let segment = SegmentFactory::new().with_id("s1").create();
    storage.store(segment.clone(), "proj").unwrap();

    let loaded = storage.load_all("proj").unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].segment_id, "s1");
}

#[test]
fn test_store_twice_keeps_single_entry() {
    let dir = tempdir().unwrap();
    let mut storage = open(&dir);

    let segment = SegmentFactory::new().with_id("s1").create();
    storage.store(segment.clone(), "proj").unwrap();
    storage.store(segment, "proj").unwrap();

    assert_eq!(storage.load_all("proj").unwrap().len(), 1);
    assert_eq!(storage.cache().len(), 1);
}

#[test]
fn test_stash_moves_segment_between_tiers() {
    let dir = tempdir().unwrap();
    let mut storage = open(&dir);

    let segment = SegmentFactory::new().with_id("s1").with_text("stash me").create();
    storage.store(segment.clone(), "proj").unwrap();
    storage.stash(segment, "proj").unwrap();

    // Tier invariant: the id lives in exactly one tier.
    assert!(!storage.working_ids("proj").contains("s1"));
    assert!(storage.stashed_ids("proj").unwrap().contains("s1"));

    let loaded = storage.load_all("proj").unwrap();
    assert_eq!(loaded.len(), 1);
    assert!(loaded[0].tier.is_stashed());
}

#[test]
fn test_working_and_stashed_ids_are_disjoint() {
    let dir = tempdir().unwrap();
    let mut storage = open(&dir);

    for i in 0..6 {
        let segment = SegmentFactory::new().with_id(format!("s{i}")).create();
        storage.store(segment, "proj").unwrap();
    }
    for i in 0..3 {
        let segment = storage.load_all("proj").unwrap();
        let victim = segment
            .into_iter()
            .find(|s| s.segment_id == format!("s{i}"))
            .unwrap();
        storage.stash(victim, "proj").unwrap();
    }

    let working = storage.working_ids("proj");
    let stashed = storage.stashed_ids("proj").unwrap();
    assert_eq!(working.len(), 3);
    assert_eq!(stashed.len(), 3);
    assert!(working.is_disjoint(&stashed));
}

#[test]
fn test_stash_then_unstash_restores_working_tier() {
    let dir = tempdir().unwrap();
    let mut storage = open(&dir);

    let segment = SegmentFactory::new().with_id("s1").with_text("round trip").create();
    storage.store(segment.clone(), "proj").unwrap();
    storage.stash(segment, "proj").unwrap();

    let stashed = storage.load_all("proj").unwrap().pop().unwrap();
    storage.unstash(stashed, "proj").unwrap();

    let loaded = storage.load_all("proj").unwrap();
    assert_eq!(loaded.len(), 1);
    assert!(loaded[0].tier.is_working());
    assert!(storage.stashed_ids("proj").unwrap().is_empty());
    // The shard no longer matches searches either.
    assert!(
        storage
            .search_stashed("round", &SearchFilters::default(), "proj")
            .unwrap()
            .is_empty()
    );
}

#[test]
fn test_repeated_stash_overwrites_shard_entry() {
    let dir = tempdir().unwrap();
    let mut storage = open(&dir);

    let segment = SegmentFactory::new().with_id("s1").create();
    storage.store(segment.clone(), "proj").unwrap();
    storage.stash(segment.clone(), "proj").unwrap();
    storage.stash(segment, "proj").unwrap();

    assert_eq!(storage.load_all("proj").unwrap().len(), 1);
}

#[test]
fn test_delete_is_idempotent() {
    let dir = tempdir().unwrap();
    let mut storage = open(&dir);

    let segment = SegmentFactory::new().with_id("s1").with_text("doomed").create();
    storage.store(segment.clone(), "proj").unwrap();
    storage.stash(segment, "proj").unwrap();

    storage.delete("s1", "proj").unwrap();
    assert!(storage.load_all("proj").unwrap().is_empty());

    // Second delete of the same id and deletes of unknown ids are no-ops.
    storage.delete("s1", "proj").unwrap();
    storage.delete("never-existed", "proj").unwrap();
}

#[test]
fn test_delete_removes_index_rows() {
    let dir = tempdir().unwrap();
    let mut storage = open(&dir);

    let segment = SegmentFactory::new()
        .with_id("s1")
        .with_text("findable text")
        .create();
    storage.store(segment.clone(), "proj").unwrap();
    storage.stash(segment, "proj").unwrap();
    storage.delete("s1", "proj").unwrap();

    assert!(
        storage
            .search_stashed("findable", &SearchFilters::default(), "proj")
            .unwrap()
            .is_empty()
    );
}

#[test]
fn test_update_working_segment_replaces_cache_entry() {
    let dir = tempdir().unwrap();
    let mut storage = open(&dir);

    let mut segment = SegmentFactory::new().with_id("s1").create();
    storage.store(segment.clone(), "proj").unwrap();

    segment.pinned = true;
    storage.update(segment, "proj").unwrap();

    let loaded = storage.load_all("proj").unwrap();
    assert!(loaded[0].pinned);
}

#[test]
fn test_update_stashed_segment_rewrites_shard_and_indexes() {
    let dir = tempdir().unwrap();
    let mut storage = open(&dir);

    let mut segment = SegmentFactory::new()
        .with_id("s1")
        .with_text("original wording")
        .create();
    storage.store(segment.clone(), "proj").unwrap();
    storage.stash(segment.clone(), "proj").unwrap();

    segment.tier = crate::engine::core::segment::Tier::Stashed;
    segment.text = "revised wording".to_string();
    storage.update(segment, "proj").unwrap();

    let hits = storage
        .search_stashed("revised", &SearchFilters::default(), "proj")
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert!(
        storage
            .search_stashed("original", &SearchFilters::default(), "proj")
            .unwrap()
            .is_empty()
    );
}

#[test]
fn test_search_empty_query_returns_all_stashed() {
    let dir = tempdir().unwrap();
    let mut storage = open(&dir);

    for i in 0..3 {
        let segment = SegmentFactory::new().with_id(format!("s{i}")).create();
        storage.store(segment.clone(), "proj").unwrap();
        storage.stash(segment, "proj").unwrap();
    }

    let hits = storage
        .search_stashed("", &SearchFilters::default(), "proj")
        .unwrap();
    assert_eq!(hits.len(), 3);
}

#[test]
fn test_search_respects_date_range_filters() {
    let dir = tempdir().unwrap();
    let mut storage = open(&dir);

    let old = SegmentFactory::new()
        .with_id("old")
        .created_hours_ago(48)
        .create();
    let fresh = SegmentFactory::new().with_id("fresh").create();
    storage.store(old.clone(), "proj").unwrap();
    storage.store(fresh.clone(), "proj").unwrap();
    storage.stash(old, "proj").unwrap();
    storage.stash(fresh, "proj").unwrap();

    let filters = SearchFilters {
        created_after: Some(crate::shared::time::now() - chrono::Duration::hours(24)),
        ..Default::default()
    };
    let hits = storage.search_stashed("", &filters, "proj").unwrap();
    let ids: HashSet<_> = hits.iter().map(|s| s.segment_id.as_str()).collect();
    assert_eq!(ids, HashSet::from(["fresh"]));
}

#[test]
fn test_project_isolation() {
    let dir = tempdir().unwrap();
    let mut storage = open(&dir);

    let a = SegmentFactory::new().with_id("a1").with_project("proj-a").create();
    storage.store(a, "proj-a").unwrap();
    for i in 0..3 {
        let b = SegmentFactory::new()
            .with_id(format!("b{i}"))
            .with_project("proj-b")
            .create();
        storage.store(b, "proj-b").unwrap();
    }

    assert_eq!(storage.load_all("proj-a").unwrap().len(), 1);
    assert_eq!(storage.load_all("proj-b").unwrap().len(), 3);

    // Stashing in B leaves A untouched.
    let victim = storage
        .load_all("proj-b")
        .unwrap()
        .into_iter()
        .find(|s| s.segment_id == "b0")
        .unwrap();
    storage.stash(victim, "proj-b").unwrap();

    assert_eq!(storage.load_all("proj-a").unwrap().len(), 1);
    assert!(storage.stashed_ids("proj-a").unwrap().is_empty());
}

#[test]
fn test_reopen_rebuilds_indexes_from_disk() {
    let dir = tempdir().unwrap();
    {
        let mut storage = open(&dir);
        let segment = SegmentFactory::new()
            .with_id("s1")
            .with_text("persisted keyword payload")
            .create();
        storage.store(segment.clone(), "proj").unwrap();
        storage.stash(segment, "proj").unwrap();
    }

    let mut reopened = open(&dir);
    let hits = reopened
        .search_stashed("persisted", &SearchFilters::default(), "proj")
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert!(reopened.indexes().keyword_index("proj").is_some());
    assert!(reopened.indexes().metadata_index("proj").is_some());
}

#[test]
fn test_crash_between_tmp_write_and_rename_preserves_shard() {
    let dir = tempdir().unwrap();
    let shard_path;
    {
        let mut storage = open(&dir);
        let segment = SegmentFactory::new().with_id("s1").with_text("survivor").create();
        storage.store(segment.clone(), "proj").unwrap();
        storage.stash(segment, "proj").unwrap();
        shard_path = storage.shard_path("proj");
    }

    // Simulate a crash mid-unstash: the temp file exists, the rename
    // never happened.
    let tmp = dir.path().join("stashed").join("proj.json.tmp");
    std::fs::write(&tmp, "{\"segments\": []}").unwrap();

    let mut reopened = open(&dir);
    let loaded = reopened.load_all("proj").unwrap();
    assert_eq!(loaded.len(), 1);
    assert!(loaded[0].tier.is_stashed());
    assert!(shard_path.exists());
    assert!(!tmp.exists());
}

#[test]
fn test_corrupt_shard_recovery_allows_new_stashes() {
    let dir = tempdir().unwrap();
    {
        let mut storage = open(&dir);
        let segment = SegmentFactory::new().with_id("s1").create();
        storage.store(segment.clone(), "proj").unwrap();
        storage.stash(segment, "proj").unwrap();
    }

    let shard = dir.path().join("stashed").join("proj.json");
    std::fs::write(&shard, "{{{ definitely not json").unwrap();

    let mut reopened = open(&dir);
    // The corrupt shard was quarantined; the project reads as empty.
    assert!(reopened.load_all("proj").unwrap().is_empty());
    assert!(dir.path().join("stashed").join("proj.json.corrupt").exists());

    // New stashes succeed normally.
    let segment = SegmentFactory::new().with_id("s2").with_text("fresh start").create();
    reopened.store(segment.clone(), "proj").unwrap();
    reopened.stash(segment, "proj").unwrap();
    let hits = reopened
        .search_stashed("fresh", &SearchFilters::default(), "proj")
        .unwrap();
    assert_eq!(hits.len(), 1);
}

#[test]
fn test_eviction_spill_survives_load_all() {
    let dir = tempdir().unwrap();
    let mut storage = StorageLayer::open(dir.path(), 2, true).unwrap();

    for i in 0..4 {
        let segment = SegmentFactory::new().with_id(format!("s{i}")).create();
        storage.store(segment, "proj").unwrap();
    }

    // Two entries were spilled to disk but all four remain loadable.
    let loaded = storage.load_all("proj").unwrap();
    assert_eq!(loaded.len(), 4);
}
