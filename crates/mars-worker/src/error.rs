// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache index error: {0}")]
    Cache(#[from] mars_cache::CacheError),

    #[error("extractor error: {0}")]
    Extractor(#[from] mars_extractor::ExtractorError),

    #[error("request-script encoding error: {0}")]
    Wire(#[from] mars_wire::WireError),

    #[error("malformed request body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("request body is missing the `{0}` field")]
    MissingField(&'static str),

    #[error("no shares configured")]
    NoShares,

    #[error("failed to install signal handler: {0}")]
    Signal(#[source] nix::Error),

    #[error("client closed the connection")]
    Disconnected,

    #[error("timed out writing to client")]
    WriteTimeout,

    #[error("malformed HTTP request: {0}")]
    MalformedHttp(String),

    #[error("websocket error: {0}")]
    WebSocket(String),
}
