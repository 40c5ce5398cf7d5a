// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use async_trait::async_trait;
use mars_core::CacheEntry;

use crate::error::CacheError;

/// Typed get/set/delete over the external distributed key-value store
///. Keys are fingerprint strings; values are [`CacheEntry`]
/// records. Implementations own the JSON framing — callers never see raw
/// bytes.
#[async_trait]
pub trait CacheIndex: Send + Sync {
    async fn get(&self, fingerprint: &str) -> Result<Option<CacheEntry>, CacheError>;
    async fn set(&self, fingerprint: &str, entry: &CacheEntry) -> Result<(), CacheError>;
    async fn delete(&self, fingerprint: &str) -> Result<(), CacheError>;
}
