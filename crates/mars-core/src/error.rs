// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors shared across the cache, extractor, worker and client crates.
///
/// Each crate also defines its own narrower error type for concerns local
/// to it; this enum covers the handful of failure modes that cross crate
/// boundaries and need a stable shape (e.g. classifying a response for
/// the client's retry logic).
#[derive(Debug, Error)]
pub enum MarsError {
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("no target specified in request")]
    MissingTarget,

    #[error("cache backend error: {0}")]
    Cache(String),

    #[error("extractor exited abnormally: {0}")]
    Extractor(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
