// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("memcached connection to {endpoint} failed: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("memcached protocol error talking to {endpoint}: {detail}")]
    Protocol { endpoint: String, detail: String },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored entry for {fingerprint} is not valid JSON: {source}")]
    Malformed {
        fingerprint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no MEMCACHED endpoints configured")]
    NoEndpoints,
}
