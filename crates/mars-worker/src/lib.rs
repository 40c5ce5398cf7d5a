// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker daemon's two transports: a hand-rolled, one-process-per-
//! connection HTTP/1.1 engine (F) and a shared-runtime WebSocket engine
//! (G). Both share [`WorkerContext`] and the extraction/caching crates;
//! see `DESIGN.md` for why the HTTP engine forks instead of running on
//! the ordinary `tokio` multi-connection model the WebSocket engine uses.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod context;
mod error;
pub mod http;
mod uid;
pub mod ws;

pub use context::WorkerContext;
pub use error::WorkerError;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

/// Bind a std `TcpListener` and run the forking HTTP engine on it. Blocks
/// the calling thread forever (or until `accept` stops returning); callers
/// that also run the WebSocket engine should give this its own OS thread
/// rather than calling it from inside a `tokio` runtime — the forking
/// model requires the parent to never have started one.
pub fn run_http(bind_addr: SocketAddr, ctx: Arc<WorkerContext>) -> io::Result<()> {
    let listener = std::net::TcpListener::bind(bind_addr)?;
    tracing::info!(%bind_addr, "http engine listening");
    http::listener::run(listener, ctx)
}

/// Run the WebSocket engine on an already-running `tokio` runtime.
pub async fn run_ws(bind_addr: SocketAddr, ctx: Arc<WorkerContext>) -> Result<(), WorkerError> {
    ws::run(bind_addr, ctx).await
}
