// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::memory::InMemoryIndex;

fn config_for(dir: &Path, shares: &[&str]) -> Config {
    let mut config = Config::default();
    config.cache_root = dir.to_string_lossy().into_owned();
    config.cache_folder = "mars".to_string();
    config.shares = shares.iter().map(|s| s.to_string()).collect();
    config
}

#[tokio::test]
async fn populate_backfills_untracked_completed_files() {
    let dir = tempfile::tempdir().unwrap();
    let cache_dir = dir.path().join("share-a").join("mars");
    std::fs::create_dir_all(&cache_dir).unwrap();
    let fp = "a".repeat(32);
    std::fs::write(cache_dir.join(format!("{fp}.grib")), b"0123456789").unwrap();

    let index = Arc::new(InMemoryIndex::new());
    let maintainer = CacheMaintainer::new(index.clone(), &config_for(dir.path(), &["share-a"]));

    let inserted = maintainer.populate().await.unwrap();
    assert_eq!(inserted, 1);

    let entry = index.get(&fp).await.unwrap().unwrap();
    assert_eq!(entry.size, Some(10));
    assert_eq!(entry.status, mars_core::CacheStatus::Completed);
}

#[tokio::test]
async fn populate_skips_files_already_tracked() {
    let dir = tempfile::tempdir().unwrap();
    let cache_dir = dir.path().join("share-a").join("mars");
    std::fs::create_dir_all(&cache_dir).unwrap();
    let fp = "b".repeat(32);
    let path = cache_dir.join(format!("{fp}.grib"));
    std::fs::write(&path, b"data").unwrap();

    let index = Arc::new(InMemoryIndex::new());
    let mut tracked = CacheEntry::queued("node", "share-a", path.to_string_lossy(), 0);
    tracked.mark_completed(4, None);
    index.set(&fp, &tracked).await.unwrap();

    let maintainer = CacheMaintainer::new(index, &config_for(dir.path(), &["share-a"]));
    let inserted = maintainer.populate().await.unwrap();
    assert_eq!(inserted, 0);
}

#[tokio::test]
async fn clean_removes_only_untracked_files() {
    let dir = tempfile::tempdir().unwrap();
    let cache_dir = dir.path().join("share-a").join("mars");
    std::fs::create_dir_all(&cache_dir).unwrap();

    let tracked_fp = "c".repeat(32);
    let tracked_path = cache_dir.join(format!("{tracked_fp}.grib"));
    std::fs::write(&tracked_path, b"data").unwrap();

    let orphan_fp = "d".repeat(32);
    let orphan_path = cache_dir.join(format!("{orphan_fp}.grib"));
    std::fs::write(&orphan_path, b"data").unwrap();

    let index = Arc::new(InMemoryIndex::new());
    let mut tracked = CacheEntry::queued("node", "share-a", tracked_path.to_string_lossy(), 0);
    tracked.mark_completed(4, None);
    index.set(&tracked_fp, &tracked).await.unwrap();

    let maintainer = CacheMaintainer::new(index, &config_for(dir.path(), &["share-a"]));
    let removed = maintainer.clean().await.unwrap();

    assert_eq!(removed, 1);
    assert!(tracked_path.exists());
    assert!(!orphan_path.exists());
}
