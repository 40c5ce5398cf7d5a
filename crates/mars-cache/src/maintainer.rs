// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::{Path, PathBuf};
use std::sync::Arc;

use mars_config::Config;
use mars_core::CacheEntry;

use crate::error::CacheError;
use crate::index::CacheIndex;

/// A fingerprint is a 32-character lowercase hex string; only files whose
/// basename matches this shape are candidates for reconciliation.
fn is_fingerprint(basename: &str) -> bool {
    basename.len() == 32 && basename.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
}

fn grib_files(folder: &Path) -> Vec<(String, PathBuf)> {
    let mut out = Vec::new();
    let Ok(entries) = std::fs::read_dir(folder) else {
        return out;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("grib") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if is_fingerprint(stem) {
            out.push((stem.to_string(), path));
        }
    }
    out
}

/// Reconciles the on-disk artifacts in every configured share's cache
/// folder with the shared index: [`CacheMaintainer::populate`] backfills
/// entries for untracked completed files, [`CacheMaintainer::clean`]
/// removes files the index no longer tracks.
pub struct CacheMaintainer<I: CacheIndex> {
    index: Arc<I>,
    cache_folders: Vec<PathBuf>,
}

impl<I: CacheIndex> CacheMaintainer<I> {
    pub fn new(index: Arc<I>, config: &Config) -> Self {
        let cache_folders = config
            .shares
            .iter()
            .map(|share| Path::new(&config.cache_root).join(share).join(&config.cache_folder))
            .collect();
        CacheMaintainer { index, cache_folders }
    }

    /// For each `*.grib` file whose basename is a 32-hex fingerprint, if
    /// the index has no entry for it, insert a synthetic `COMPLETED`
    /// entry sized from the file's actual length.
    pub async fn populate(&self) -> Result<usize, CacheError> {
        let mut inserted = 0;
        for folder in &self.cache_folders {
            for (fingerprint, path) in grib_files(folder) {
                if self.index.get(&fingerprint).await?.is_some() {
                    continue;
                }
                let Ok(metadata) = std::fs::metadata(&path) else {
                    continue;
                };
                let share = folder
                    .parent()
                    .and_then(|p| p.file_name())
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let mut entry = CacheEntry::queued(mars_core::nodename(), share, path.to_string_lossy(), 0);
                entry.mark_completed(metadata.len(), None);
                self.index.set(&fingerprint, &entry).await?;
                inserted += 1;
            }
        }
        tracing::info!(inserted, "cache maintainer populate complete");
        Ok(inserted)
    }

    /// Delete every `*.grib` file whose fingerprint has no index entry.
    /// Must run after [`Self::populate`] so files it just backfilled are
    /// not immediately deleted again.
    pub async fn clean(&self) -> Result<usize, CacheError> {
        let mut removed = 0;
        for folder in &self.cache_folders {
            for (fingerprint, path) in grib_files(folder) {
                if self.index.get(&fingerprint).await?.is_some() {
                    continue;
                }
                tracing::info!(path = %path.display(), "removing orphaned artifact not tracked by cache index");
                if std::fs::remove_file(&path).is_ok() {
                    removed += 1;
                }
            }
        }
        tracing::info!(removed, "cache maintainer clean complete");
        Ok(removed)
    }
}

#[cfg(test)]
#[path = "maintainer_tests.rs"]
mod tests;
