// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::io::SeekFrom;
use std::path::Path;

use futures_util::{Stream, StreamExt};
use mars_wire::Sentinel;
use serde::Deserialize;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

use crate::error::ClientError;

/// Whether the local target file is opened fresh or appended to: the
/// first sub-request of a batch opens `Write` (truncating), every
/// subsequent one opens `Append`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Write,
    Append,
}

/// The JSON body that follows an in-band `EROR` sentinel:
/// mirrors the same classification the worker also carries in response
/// headers, so a client that only watches the body still gets the retry
/// hints.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    exited: Option<i32>,
    #[serde(default)]
    killed: Option<i32>,
    #[serde(default)]
    retry_same_host: Option<bool>,
    #[serde(default)]
    retry_next_host: Option<bool>,
}

/// The result of running the transfer loop to completion: how many
/// bytes ended up at `position`. An in-band `EROR` frame short-circuits
/// the loop with `Err(ClientError::Extractor { .. })` instead.
pub struct TransferOutcome {
    pub position: u64,
}

async fn open_target(target: &Path, mode: OpenMode) -> Result<tokio::fs::File, ClientError> {
    if let Some(parent) = target.parent() {
        let _ = tokio::fs::create_dir_all(parent).await;
    }
    tokio::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(mode == OpenMode::Write)
        .open(target)
        .await
        .map_err(|e| ClientError::Protocol(format!("failed to open target {}: {e}", target.display())))
}

/// Consume a chunked-transfer body: ordinary chunks are artifact
/// bytes written at the current position; exactly-4-byte chunks are
/// control sentinels (`RWND`/`ENDR`/`EROR`).
///
/// `position` is the session's saved position — the start of the
/// *current* sub-request, not absolute zero — so a `RWND` received
/// partway through the second element of a batch rewinds only that
/// element's bytes, not the whole file.
pub async fn run<S>(mut body: S, target: &Path, open_mode: OpenMode, start_position: u64) -> Result<TransferOutcome, ClientError>
where
    S: Stream<Item = reqwest::Result<bytes::Bytes>> + Unpin,
{
    let mut file = open_target(target, open_mode).await?;
    let mut position = start_position;
    file.seek(SeekFrom::Start(position))
        .await
        .map_err(|e| ClientError::Protocol(format!("seek failed: {e}")))?;

    let mut expect_error_next = false;
    let mut received_endr = false;

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| ClientError::Transport { url: String::new(), detail: e.to_string() })?;

        if expect_error_next {
            let error: ErrorBody = serde_json::from_slice(&chunk).map_err(|e| ClientError::Protocol(format!("malformed EROR body: {e}")))?;
            let detail = error.message.clone().unwrap_or_else(|| {
                if let Some(code) = error.exited {
                    format!("extractor exited with code {code}")
                } else if let Some(signal) = error.killed {
                    format!("extractor killed by signal {signal}")
                } else {
                    "extractor reported an error".to_string()
                }
            });
            return Err(ClientError::Extractor {
                message: detail,
                retry_same_host: error.retry_same_host.unwrap_or(true),
                retry_next_host: error.retry_next_host.unwrap_or(false),
            });
        }

        if chunk.len() == 4 {
            let sentinel = Sentinel::parse(&chunk).ok_or_else(|| {
                ClientError::Protocol(format!("unrecognized 4-byte control chunk: {chunk:?}"))
            })?;
            match sentinel {
                Sentinel::Rwnd => {
                    position = start_position;
                    file.seek(SeekFrom::Start(position))
                        .await
                        .map_err(|e| ClientError::Protocol(format!("seek failed: {e}")))?;
                    file.set_len(position).await.map_err(|e| ClientError::Protocol(format!("truncate failed: {e}")))?;
                }
                Sentinel::Endr => {
                    received_endr = true;
                }
                Sentinel::Eror => {
                    expect_error_next = true;
                }
            }
            continue;
        }

        file.write_all(&chunk).await.map_err(|e| ClientError::Protocol(format!("write failed: {e}")))?;
        position += chunk.len() as u64;
    }

    if !received_endr {
        return Err(ClientError::Protocol("transfer ended without ENDR: incomplete".to_string()));
    }

    file.flush().await.map_err(|e| ClientError::Protocol(format!("flush failed: {e}")))?;
    Ok(TransferOutcome { position })
}

#[cfg(test)]
#[path = "transfer_tests.rs"]
mod tests;
