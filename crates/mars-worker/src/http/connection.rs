// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use tokio::io::{AsyncRead, AsyncWrite, BufReader};

use crate::context::WorkerContext;
use crate::error::WorkerError;

use super::{body, get_delete, head, post, wire};

/// Handle one accepted connection end to end: parse the request head,
/// dispatch on method/path, and answer it. Each connection runs inside its
/// own forked child process, so there is exactly one request here —
/// no keep-alive loop to run.
pub async fn handle<R, W>(read_half: R, mut write_half: W, ctx: &WorkerContext) -> Result<(), WorkerError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(read_half);
    let head_result = wire::read_request_head(&mut reader).await;

    let request_head = match head_result {
        Ok(head) => head,
        Err(err) => {
            tracing::debug!(error = %err, "malformed request");
            return Err(err);
        }
    };

    tracing::debug!(method = %request_head.method, path = %request_head.path, "request received");

    match (request_head.method.as_str(), request_head.path.as_str()) {
        ("HEAD", _) => head::handle(write_half, ctx).await,
        ("GET", path) => get_delete::get(write_half, ctx, path).await,
        ("DELETE", path) => get_delete::delete(write_half, ctx, path).await,
        ("POST", _) => {
            let content_length = request_head.content_length();
            let raw_body = wire::read_body(&mut reader, content_length).await?;
            let parsed = body::parse(&raw_body)?;
            post::handle(reader, write_half, ctx, parsed).await
        }
        (method, path) => {
            tracing::warn!(method, path, "unsupported method/path");
            wire::write_headers(&mut write_half, 404, &[]).await?;
            Ok(())
        }
    }
}
