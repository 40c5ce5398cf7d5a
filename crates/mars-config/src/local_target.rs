// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::{Path, PathBuf};

use mars_core::CacheEntry;
use rand::seq::SliceRandom;

use crate::config::Config;
use crate::error::ConfigError;

/// Where a completed cache entry's artifact is actually reachable from a
/// given client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalTarget {
    /// The artifact exists on a share mounted locally at this path.
    Local(PathBuf),
    /// The artifact is not locally reachable; fetch it from this mirror.
    Mirror(String),
}

/// Resolve a completed [`CacheEntry`] to a path the caller can actually
/// read, substituting the worker's cache-root prefix for the client's own
/// and falling back to a randomly chosen download-server mirror URL when
/// the substituted path does not exist.
///
/// The original implementation re-derives `share` by splitting the stored
/// target path around `/<cache_folder>/`; this port uses `entry.share`
/// directly, since the Rust [`CacheEntry`] already carries it as a field
/// (see DESIGN.md).
pub fn local_target(entry: &CacheEntry, config: &Config) -> Result<LocalTarget, ConfigError> {
    let filename = Path::new(&entry.target)
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| entry.target.clone());

    let marker = format!("/{}/", entry.share);
    if let Some(idx) = entry.target.find(&marker) {
        let suffix = &entry.target[idx..];
        let candidate = format!("{}{}", config.cache_root.trim_end_matches('/'), suffix);
        if Path::new(&candidate).exists() {
            return Ok(LocalTarget::Local(PathBuf::from(candidate)));
        }
    }

    let server = config
        .download_servers
        .choose(&mut rand::thread_rng())
        .ok_or(ConfigError::NoDownloadServers)?;

    Ok(LocalTarget::Mirror(format!(
        "{}/{}/{}/{}",
        server.trim_end_matches('/'),
        entry.share,
        config.cache_folder,
        filename
    )))
}

#[cfg(test)]
#[path = "local_target_tests.rs"]
mod tests;
