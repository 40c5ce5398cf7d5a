// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;

use async_trait::async_trait;
use mars_core::CacheEntry;
use parking_lot::Mutex;

use crate::error::CacheError;
use crate::index::CacheIndex;

/// An in-process fake of [`CacheIndex`], for tests that exercise the
/// coalescing protocol without a real memcached endpoint.
#[derive(Default)]
pub struct InMemoryIndex {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheIndex for InMemoryIndex {
    async fn get(&self, fingerprint: &str) -> Result<Option<CacheEntry>, CacheError> {
        Ok(self.entries.lock().get(fingerprint).cloned())
    }

    async fn set(&self, fingerprint: &str, entry: &CacheEntry) -> Result<(), CacheError> {
        self.entries.lock().insert(fingerprint.to_string(), entry.clone());
        Ok(())
    }

    async fn delete(&self, fingerprint: &str) -> Result<(), CacheError> {
        self.entries.lock().remove(fingerprint);
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
