// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::context::WorkerContext;
use crate::error::WorkerError;
use crate::uid;

use super::wire::write_headers;

fn uid_from_path(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or("")
}

/// `GET /<uid>`: return the extractor's log for `uid`, 404 if
/// the uid fails strict validation or the log file is absent.
pub async fn get<W: AsyncWrite + Unpin>(mut writer: W, ctx: &WorkerContext, path: &str) -> Result<(), WorkerError> {
    let uid = uid_from_path(path);
    if !uid::validate(uid) {
        write_headers(&mut writer, 404, &[]).await?;
        return Ok(());
    }

    let log_path = ctx.log_path(uid);
    match tokio::fs::read(&log_path).await {
        Ok(contents) => {
            write_headers(
                &mut writer,
                200,
                &[("Content-Type", "text/plain".to_string()), ("Content-Length", contents.len().to_string())],
            )
            .await?;
            writer.write_all(&contents).await?;
            Ok(())
        }
        Err(_) => {
            write_headers(&mut writer, 404, &[]).await?;
            Ok(())
        }
    }
}

/// `DELETE /<uid>`: remove the log file if present. Always
/// `204`, even if the uid was invalid or the file never existed — this
/// handler is meant to be idempotent so a client's best-effort cleanup
/// never needs to special-case "already gone".
pub async fn delete<W: AsyncWrite + Unpin>(mut writer: W, ctx: &WorkerContext, path: &str) -> Result<(), WorkerError> {
    let uid = uid_from_path(path);
    if uid::validate(uid) {
        let _ = tokio::fs::remove_file(ctx.log_path(uid)).await;
    }
    write_headers(&mut writer, 204, &[]).await?;
    Ok(())
}
