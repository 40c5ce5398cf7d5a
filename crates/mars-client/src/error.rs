// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// The four-way failure taxonomy, always reclassified at the
/// session boundary into a [`crate::SessionResult`] before the cluster
/// client decides whether (and where) to retry.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection refused, DNS failure, TLS failure, or a HEAD/GET/POST
    /// timeout. Always `retry_next_host`.
    #[error("transport error contacting {url}: {detail}")]
    Transport { url: String, detail: String },

    /// Malformed `X-DATA`, an unrecognized 4-byte sentinel, a missing
    /// `ENDR`, or a truncated chunked body.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The extractor exited non-zero or was killed by a signal, carried
    /// in the response body/headers so the client never has to parse the
    /// body to decide whether to retry.
    #[error("extractor failed: {message}")]
    Extractor { message: String, retry_same_host: bool, retry_next_host: bool },

    /// The worker's published `CACHE_CONFIG` does not cover this
    /// client's configured shares. `retry_next_host`, never POST.
    #[error("worker {0} does not publish all of this client's configured shares")]
    SharesMismatch(String),
}
