// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `marsd`: the MARS worker daemon's `server` subcommand. Binds the
//! forking HTTP engine and the WebSocket engine on the same host/port
//! pair, sharing one [`mars_worker::WorkerContext`].

mod daemonize;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use mars_cache::MemcachedIndex;
use mars_config::Config;
use mars_worker::WorkerContext;

/// Set up a MARS server to execute requests.
#[derive(Parser)]
#[command(name = "marsd", version, about)]
struct ServerArgs {
    /// Path to the mars executable.
    #[arg(short = 'm', long, default_value = "/usr/local/bin/mars")]
    mars_executable: String,

    /// Host to listen on.
    #[arg(short = 'H', long, default_value = "")]
    host: String,

    /// Port to listen on.
    #[arg(short = 'p', long, default_value_t = 9000)]
    port: u16,

    /// Port for the WebSocket engine. Defaults to `port + 1`: the two
    /// engines are independent listeners (see DESIGN.md), never sharing
    /// one socket.
    #[arg(long)]
    ws_port: Option<u16>,

    /// Timeout (seconds) for sending data to the client.
    #[arg(short = 't', long, default_value_t = 30)]
    timeout: u64,

    /// Path to the log directory.
    #[arg(short = 'l', long, default_value = ".")]
    logdir: PathBuf,

    /// PID file.
    #[arg(long)]
    pidfile: Option<PathBuf>,

    /// Detach the server from the terminal.
    #[arg(long)]
    daemonize: bool,
}

fn main() -> Result<()> {
    let args = ServerArgs::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!(host = %args.host, port = args.port, logdir = %args.logdir.display(), "starting server");

    if args.daemonize {
        daemonize::daemonize().context("failed to daemonize")?;
    }

    if let Some(pidfile) = &args.pidfile {
        daemonize::write_pidfile(pidfile).context("failed to write pidfile")?;
    }

    std::fs::create_dir_all(&args.logdir).context("failed to create log directory")?;

    let config = Config::load().context("failed to load configuration")?;
    let index: Arc<dyn mars_cache::CacheIndex> = Arc::new(MemcachedIndex::new(config.memcached.clone()));
    let ctx = Arc::new(WorkerContext::new(config, index, args.mars_executable.clone(), args.logdir.clone(), Duration::from_secs(args.timeout)));

    let host = if args.host.is_empty() { "0.0.0.0" } else { &args.host };
    let http_bind_addr: SocketAddr = format!("{host}:{}", args.port).parse().context("invalid host/port")?;
    let ws_bind_addr: SocketAddr = format!("{host}:{}", args.ws_port.unwrap_or(args.port + 1)).parse().context("invalid host/ws-port")?;

    // The HTTP engine forks per connection and must never run inside an
    // already-started tokio runtime, so it gets its own OS thread;
    // the WebSocket engine runs on the ordinary multi-connection runtime
    // built by `#[tokio::main]`-equivalent code below.
    let http_ctx = ctx.clone();
    let http_thread = std::thread::Builder::new()
        .name("mars-http-engine".to_string())
        .spawn(move || {
            if let Err(err) = mars_worker::run_http(http_bind_addr, http_ctx) {
                tracing::error!(error = %err, "http engine exited");
            }
        })
        .context("failed to spawn http engine thread")?;

    let runtime = tokio::runtime::Runtime::new().context("failed to build tokio runtime")?;
    runtime.block_on(async move {
        if let Err(err) = mars_worker::run_ws(ws_bind_addr, ctx).await {
            tracing::error!(error = %err, "websocket engine exited");
        }
    });

    let _ = http_thread.join();
    Ok(())
}
