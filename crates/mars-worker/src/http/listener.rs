// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::io;
use std::net::TcpListener as StdTcpListener;
use std::sync::Arc;

use nix::sys::signal::{signal, SigHandler, Signal};
use nix::unistd::ForkResult;

use crate::context::WorkerContext;

/// Accept connections on a plain blocking `std::net::TcpListener` and
/// `fork()` a child process per connection. No tokio runtime
/// runs in the parent: forking a live multi-threaded async runtime is
/// unsound, so the parent here stays fully synchronous and each child
/// builds its own fresh single-threaded runtime after `fork()` returns —
/// mirroring a `ForkingHTTPServer` whose handler closes the inherited
/// accept socket in the child.
pub fn run(listener: StdTcpListener, ctx: Arc<WorkerContext>) -> io::Result<()> {
    install_sigchld_handler()?;

    loop {
        let (stream, peer) = match listener.accept() {
            Ok(pair) => pair,
            Err(err) => {
                tracing::warn!(error = %err, "accept failed");
                continue;
            }
        };

        // Safety: between fork and exec/return there is no allocation or
        // other non-async-signal-safe work on the child's path below —
        // it only drops an fd and builds a fresh runtime.
        match unsafe { nix::unistd::fork() } {
            Ok(ForkResult::Parent { child, .. }) => {
                tracing::debug!(pid = child.as_raw(), %peer, "forked connection handler");
                drop(stream);
            }
            Ok(ForkResult::Child) => {
                drop(listener);
                serve_one(stream, &ctx);
                std::process::exit(0);
            }
            Err(err) => {
                tracing::error!(error = %err, "fork failed, serving without process isolation");
                serve_one(stream, &ctx);
            }
        }
    }
}

fn install_sigchld_handler() -> io::Result<()> {
    // Safety: installed once before any child is forked, and never run
    // concurrently with other signal-handling setup.
    unsafe { signal(Signal::SIGCHLD, SigHandler::SigIgn) }
        .map_err(|errno| io::Error::from_raw_os_error(errno as i32))?;
    Ok(())
}

/// Build a fresh single-threaded runtime and run exactly one connection to
/// completion. Called either in a forked child (about to exit anyway) or,
/// if `fork()` itself failed, inline in the parent as a degraded fallback.
fn serve_one(stream: std::net::TcpStream, ctx: &WorkerContext) {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            tracing::error!(error = %err, "failed to build per-connection runtime");
            return;
        }
    };

    runtime.block_on(async move {
        if let Err(err) = stream.set_nonblocking(true) {
            tracing::error!(error = %err, "failed to set connection nonblocking");
            return;
        }
        let stream = match tokio::net::TcpStream::from_std(stream) {
            Ok(stream) => stream,
            Err(err) => {
                tracing::error!(error = %err, "failed to adopt connection into runtime");
                return;
            }
        };
        let (read_half, write_half) = stream.into_split();
        if let Err(err) = super::handle(read_half, write_half, ctx).await {
            tracing::warn!(error = %err, "connection handler failed");
        }
    });
}
