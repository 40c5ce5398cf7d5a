// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use mars_cache::CacheIndex;
use mars_config::Config;
use serde_json::json;

/// Shared, read-mostly state handed to every connection handler: the
/// cache index client, resolved configuration, and the knobs a
/// connection needs but nothing a connection should own exclusively.
pub struct WorkerContext {
    pub config: Config,
    pub index: Arc<dyn CacheIndex>,
    pub mars_executable: String,
    pub logdir: PathBuf,
    pub timeout: Duration,
    pub host: String,
}

impl WorkerContext {
    pub fn new(
        config: Config,
        index: Arc<dyn CacheIndex>,
        mars_executable: impl Into<String>,
        logdir: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        WorkerContext {
            config,
            index,
            mars_executable: mars_executable.into(),
            logdir: logdir.into(),
            timeout,
            host: mars_core::nodename(),
        }
    }

    /// The `CACHE_CONFIG` header body the HEAD handler echoes: a
    /// JSON object naming at least `SHARES`.
    pub fn cache_config_header(&self) -> String {
        json!({ "SHARES": self.config.shares }).to_string()
    }

    pub fn log_path(&self, uid: &str) -> PathBuf {
        self.logdir.join(format!("{uid}.log"))
    }

    /// Resolve a cache entry's share-relative `target` to a path on this
    /// host's filesystem by prefixing it with the configured cache root.
    pub fn resolve_target(&self, target: &str) -> PathBuf {
        Path::new(&self.config.cache_root).join(target.trim_start_matches('/'))
    }
}
