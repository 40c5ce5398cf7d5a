// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::time::Duration;

use mars_core::{CacheEntry, CacheStatus, Request};
use mars_extractor::{classify_exit, ExitClassification, FileExtraction, PipeExtraction};
use mars_wire::Sentinel;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use rand::seq::SliceRandom;
use serde_json::json;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::context::WorkerContext;
use crate::error::WorkerError;

use super::body::PostBody;
use super::wire::{encode_chunk, write_headers, FINAL_CHUNK};

/// `POST /`: dispatches to pipe mode (inline chunked artifact) or
/// file mode (coalescing pointer protocol), per the body's `type` field.
pub async fn handle<R, W>(read_half: R, write_half: W, ctx: &WorkerContext, body: PostBody) -> Result<(), WorkerError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let uid = body.environ.get("request_id").cloned().unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    if body.pipe_mode {
        pipe_mode(read_half, write_half, ctx, &body.requests, &body.environ, &uid).await
    } else {
        file_mode(write_half, ctx, &body.requests, &body.environ, &uid).await
    }
}

/// Exit classification rendered the way the worker's error JSON body and
/// mirrored headers describe it: `{"exited": N}` or
/// `{"killed": N, "retry_same_host": bool, "retry_next_host": bool}`.
struct Classified {
    status: u16,
    exit_code_header: Option<i32>,
    signal_header: Option<i32>,
    retry_same_host: Option<bool>,
    retry_next_host: Option<bool>,
    body: serde_json::Value,
}

fn classify(classification: ExitClassification) -> Option<Classified> {
    match classification {
        ExitClassification::Success => None,
        ExitClassification::ExitedWithCode(code) => Some(Classified {
            status: 400,
            exit_code_header: Some(code),
            signal_header: None,
            retry_same_host: None,
            retry_next_host: None,
            body: json!({ "exited": code }),
        }),
        ExitClassification::KilledBySignal(sig) => {
            let hints = classification.retry_hints();
            Some(Classified {
                status: 500,
                exit_code_header: None,
                signal_header: Some(sig),
                retry_same_host: hints.retry_same_host,
                retry_next_host: hints.retry_next_host,
                body: json!({
                    "killed": sig,
                    "retry_same_host": hints.retry_same_host,
                    "retry_next_host": hints.retry_next_host,
                }),
            })
        }
    }
}

async fn pipe_mode<R, W>(
    mut read_half: R,
    mut write_half: W,
    ctx: &WorkerContext,
    requests: &[Request],
    environ: &HashMap<String, String>,
    uid: &str,
) -> Result<(), WorkerError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let PipeExtraction { mut child, mut artifact } =
        mars_extractor::spawn_pipe(&ctx.mars_executable, requests, uid, &ctx.logdir, environ).await?;

    let mut buf = vec![0u8; 64 * 1024];
    let mut sent_any = false;
    let mut disconnect_probe = [0u8; 1];

    loop {
        tokio::select! {
            biased;
            _ = read_disconnect_probe(&mut read_half, &mut disconnect_probe) => {
                tracing::warn!(uid, "client closed connection, killing extractor");
                if let Some(pid) = child.id() {
                    let _ = signal::kill(Pid::from_raw(pid as i32), Signal::SIGKILL);
                }
                let _ = child.wait().await;
                return Err(WorkerError::Disconnected);
            }
            read = artifact.read(&mut buf) => {
                let n = read?;
                if n == 0 {
                    break;
                }
                if !sent_any {
                    write_headers(
                        &mut write_half,
                        200,
                        &[
                            ("X-MARS-UID", uid.to_string()),
                            ("Content-Type", "application/binary".to_string()),
                            ("Transfer-Encoding", "chunked".to_string()),
                        ],
                    )
                    .await?;
                    sent_any = true;
                }
                let framed = encode_chunk(&buf[..n]);
                tokio::time::timeout(ctx.timeout, write_half.write_all(&framed))
                    .await
                    .map_err(|_| WorkerError::WriteTimeout)??;
            }
        }
    }

    let status = child.wait().await?;
    let classification = classify_exit(status);

    match classify(classification) {
        None => {
            if !sent_any {
                write_headers(
                    &mut write_half,
                    200,
                    &[("X-MARS-UID", uid.to_string()), ("Content-Type", "application/binary".to_string()), ("Transfer-Encoding", "chunked".to_string())],
                )
                .await?;
            }
            write_half.write_all(FINAL_CHUNK).await?;
            Ok(())
        }
        Some(classified) => {
            let body_bytes = serde_json::to_vec(&classified.body)?;
            if !sent_any {
                let mut headers = vec![("X-MARS-UID", uid.to_string()), ("Content-Type", "application/json".to_string())];
                if let Some(code) = classified.exit_code_header {
                    headers.push(("X-MARS-EXIT-CODE", code.to_string()));
                }
                if let Some(sig) = classified.signal_header {
                    headers.push(("X-MARS-SIGNAL", sig.to_string()));
                }
                if let Some(v) = classified.retry_same_host {
                    headers.push(("X-MARS-RETRY-SAME-HOST", (v as u8).to_string()));
                }
                if let Some(v) = classified.retry_next_host {
                    headers.push(("X-MARS-RETRY-NEXT-HOST", (v as u8).to_string()));
                }
                write_headers(&mut write_half, classified.status, &headers).await?;
                write_half.write_all(&body_bytes).await?;
            } else {
                write_half.write_all(&encode_chunk(Sentinel::Eror.as_bytes())).await?;
                write_half.write_all(&encode_chunk(&body_bytes)).await?;
                write_half.write_all(FINAL_CHUNK).await?;
            }
            Ok(())
        }
    }
}

/// Probe the client socket for readability: any data (or EOF) there is a
/// disconnect signal in this protocol, since a well-behaved client never
/// writes again after the POST body.
async fn read_disconnect_probe<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8; 1]) {
    // A real socket ends this future only on EOF; there is nothing else for
    // a conforming client to send on this connection, so any readiness here
    // is treated as a disconnect regardless of how many bytes came back.
    let _ = reader.read(buf).await;
}

async fn file_mode<W: AsyncWrite + Unpin>(
    mut write_half: W,
    ctx: &WorkerContext,
    requests: &[Request],
    environ: &HashMap<String, String>,
    uid: &str,
) -> Result<(), WorkerError> {
    let request = requests.first().ok_or(WorkerError::MissingField("request"))?.clone();
    let fingerprint = request.fingerprint();

    let existing = ctx.index.get(&fingerprint).await?;

    // Everything reaching past this match is about to (re)run an
    // extraction; the two cases that can answer from the cache alone
    // return directly.
    let entry = match existing {
        None => {
            let share = ctx.config.shares.choose(&mut rand::thread_rng()).ok_or(WorkerError::NoShares)?.clone();
            let target = format!("{}/{}/{}.grib", share, ctx.config.cache_folder, fingerprint);
            let entry = CacheEntry::queued(ctx.host.clone(), share, target, 0);
            ctx.index.set(&fingerprint, &entry).await?;
            entry
        }
        Some(mut entry) if matches!(entry.status, CacheStatus::Queued | CacheStatus::Running) => {
            entry.record_access();
            let _ = ctx.index.set(&fingerprint, &entry).await;
            return respond_with_entry(&mut write_half, uid, &entry).await;
        }
        Some(mut entry) if entry.status == CacheStatus::Completed && ctx.resolve_target(&entry.target).exists() => {
            entry.record_access();
            let _ = ctx.index.set(&fingerprint, &entry).await;
            return respond_with_entry(&mut write_half, uid, &entry).await;
        }
        Some(entry) => {
            // COMPLETED-but-missing or FAILED: resurrect onto the same
            // share/target, reset `access` the way a brand-new entry would
            // start.
            let fresh = CacheEntry::queued(ctx.host.clone(), entry.share.clone(), entry.target.clone(), 0);
            ctx.index.set(&fingerprint, &fresh).await?;
            fresh
        }
    };

    match run_file_extraction(ctx, &request, environ, uid, &fingerprint, entry).await {
        Ok(final_entry) => respond_with_entry(&mut write_half, uid, &final_entry).await,
        Err((status_code, failed_entry)) => respond_failed(&mut write_half, ctx, &fingerprint, uid, status_code, &failed_entry).await,
    }
}

async fn run_file_extraction(
    ctx: &WorkerContext,
    request: &Request,
    environ: &HashMap<String, String>,
    uid: &str,
    fingerprint: &str,
    mut entry: CacheEntry,
) -> Result<CacheEntry, (u16, CacheEntry)> {
    let target_full_path = ctx.resolve_target(&entry.target);
    let target_full_path_str = target_full_path.to_string_lossy().into_owned();

    let mut child = match mars_extractor::spawn_file(&ctx.mars_executable, std::slice::from_ref(request), &target_full_path_str, uid, &ctx.logdir, environ).await {
        Ok(FileExtraction { child }) => child,
        Err(e) => {
            entry.mark_failed(e.to_string());
            let _ = ctx.index.set(fingerprint, &entry).await;
            return Err((500, entry));
        }
    };

    let log_path = ctx.log_path(uid);
    let expected_size = mars_extractor::wait_for_expected_size(&log_path, Duration::from_millis(4), Duration::from_secs(40)).await;

    let Some(size) = expected_size else {
        // Bounded wait elapsed without the log revealing the size yet
        //: respond with the still-QUEUED entry, client polls.
        return Ok(entry);
    };

    entry.mark_running();
    entry.size = Some(size);
    let _ = ctx.index.set(fingerprint, &entry).await;

    loop {
        let current = std::fs::metadata(&target_full_path).map(|m| m.len()).unwrap_or(0);
        if current >= size {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    if let Err(e) = child.wait().await {
        entry.mark_failed(e.to_string());
        let _ = ctx.index.set(fingerprint, &entry).await;
        return Err((500, entry));
    }

    entry.mark_completed(size, None);
    let _ = ctx.index.set(fingerprint, &entry).await;
    Ok(entry)
}

async fn respond_with_entry<W: AsyncWrite + Unpin>(write_half: &mut W, uid: &str, entry: &CacheEntry) -> Result<(), WorkerError> {
    let data = serde_json::to_string(entry)?;
    write_headers(write_half, 200, &[("X-MARS-UID", uid.to_string()), ("Content-Type", "application/json".to_string()), ("X-DATA", data.clone())]).await?;
    write_half.write_all(data.as_bytes()).await?;
    Ok(())
}

async fn respond_failed<W: AsyncWrite + Unpin>(
    write_half: &mut W,
    ctx: &WorkerContext,
    fingerprint: &str,
    uid: &str,
    status: u16,
    entry: &CacheEntry,
) -> Result<(), WorkerError> {
    // The FAILED entry itself was already durably written by
    // `run_file_extraction` before this function is reached (cache writes
    // are the only place status transitions are made durable.
    // A subsequent request for the same fingerprint reads it back, sees
    // FAILED, and resurrects it to a fresh QUEUED entry —
    // nothing here needs to touch the index.
    let _ = fingerprint;

    let data = serde_json::to_string(entry)?;
    write_headers(write_half, status, &[("X-MARS-UID", uid.to_string()), ("Content-Type", "application/json".to_string()), ("X-DATA", data.clone())]).await?;
    write_half.write_all(data.as_bytes()).await?;
    Ok(())
}

#[cfg(test)]
#[path = "post_tests.rs"]
mod tests;
