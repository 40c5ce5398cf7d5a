// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("failed to open log file {path}: {source}")]
    LogFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create artifact pipe: {0}")]
    Pipe(#[source] std::io::Error),

    #[error("failed to spawn extractor: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("failed to write request script: {0}")]
    Wire(#[from] mars_wire::WireError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
