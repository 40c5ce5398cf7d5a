// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

/// Lifecycle state of a cache entry.
///
/// Only the four states the worker and client protocols actually consult
/// are modeled; a wider status vocabulary also including `ACCEPTED` and
/// `DELETED` was considered, but nothing ever reads those paths (see
/// DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CacheStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl CacheStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, CacheStatus::Completed | CacheStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Queued => "QUEUED",
            CacheStatus::Running => "RUNNING",
            CacheStatus::Completed => "COMPLETED",
            CacheStatus::Failed => "FAILED",
        }
    }
}

/// A cache record as stored under a request's fingerprint.
///
/// `host` and `share` identify which worker node and filesystem share own
/// the extraction (needed so a client can poll the right mount in file
/// mode); `size` is populated once the extractor has started writing and
/// is refreshed by polling the target file; `message` carries the final
/// human-readable outcome (an error description on `Failed`, or extractor
/// summary output on `Completed`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub status: CacheStatus,
    pub host: String,
    pub share: String,
    pub target: String,
    pub size: Option<u64>,
    pub access: u64,
    pub message: Option<String>,
}

impl CacheEntry {
    pub fn queued(host: impl Into<String>, share: impl Into<String>, target: impl Into<String>, access: u64) -> Self {
        CacheEntry {
            status: CacheStatus::Queued,
            host: host.into(),
            share: share.into(),
            target: target.into(),
            size: None,
            access,
            message: None,
        }
    }

    /// Bump the hit counter: every request that finds an existing,
    /// reusable entry (QUEUED/RUNNING/COMPLETED-and-present) increments
    /// it, mirroring the original's `access: _cache.get('access', 0) + 1`
    /// (see DESIGN.md).
    pub fn record_access(&mut self) {
        self.access += 1;
    }

    pub fn mark_running(&mut self) {
        self.status = CacheStatus::Running;
    }

    pub fn mark_completed(&mut self, size: u64, message: Option<String>) {
        self.status = CacheStatus::Completed;
        self.size = Some(size);
        self.message = message;
    }

    pub fn mark_failed(&mut self, message: impl Into<String>) {
        self.status = CacheStatus::Failed;
        self.message = Some(message.into());
    }

    /// A `Failed` entry is eligible for resurrection back to `Queued` by a
    /// fresh request with the same fingerprint.
    pub fn retryable(&self) -> bool {
        self.status == CacheStatus::Failed
    }
}

#[cfg(test)]
#[path = "cache_entry_tests.rs"]
mod tests;
