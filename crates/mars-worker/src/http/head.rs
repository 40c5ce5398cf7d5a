// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use tokio::io::AsyncWrite;

use crate::context::WorkerContext;
use crate::error::WorkerError;

use super::wire::write_headers;

/// `HEAD /`: a liveness ping that also echoes the worker's cache-
/// visibility configuration so a client can decide whether this worker is
/// even usable before POSTing.
pub async fn handle<W: AsyncWrite + Unpin>(mut writer: W, ctx: &WorkerContext) -> Result<(), WorkerError> {
    write_headers(&mut writer, 204, &[("CACHE_CONFIG", ctx.cache_config_header())]).await?;
    Ok(())
}
