// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Module G: the WebSocket alternative transport. A single shared
//! `tokio` runtime runs every connection as its own task — unlike the HTTP
//! engine's forking model, nothing here needs process-level isolation, so
//! there is no reason to pay fork's cost per connection.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use mars_core::Request;
use mars_wire::{write_request_script, TargetSpec};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::context::WorkerContext;
use crate::error::WorkerError;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(20);

struct Job {
    child: Child,
    job_id: String,
    request_file: PathBuf,
    target_file: PathBuf,
}

/// Accept WebSocket connections on `bind_addr` until the process is torn
/// down; each connection is handled in its own task.
pub async fn run(bind_addr: SocketAddr, ctx: Arc<WorkerContext>) -> Result<(), WorkerError> {
    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!(%bind_addr, "websocket engine listening");

    loop {
        let (stream, peer) = listener.accept().await?;
        let ctx = Arc::clone(&ctx);
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, &ctx).await {
                tracing::warn!(%peer, error = %err, "websocket session ended with an error");
            }
        });
    }
}

async fn handle_connection(stream: TcpStream, ctx: &WorkerContext) -> Result<(), WorkerError> {
    let ws = tokio_tungstenite::accept_async(stream).await.map_err(|e| WorkerError::WebSocket(e.to_string()))?;
    let (mut write, mut read) = ws.split();

    let mut job: Option<Job> = None;
    let (log_tx, mut log_rx) = mpsc::unbounded_channel::<String>();
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                if send_json(&mut write, json!({ "type": "heartbeat" })).await.is_err() {
                    break;
                }
            }
            line = log_rx.recv() => {
                if let Some(line) = line {
                    let _ = send_json(&mut write, json!({ "type": "log", "line": line })).await;
                }
            }
            status = wait_job(job.as_mut()) => {
                if let Some(finished) = job.take() {
                    let returncode = status.ok().and_then(|s| s.code()).unwrap_or(-1);
                    let result = if returncode == 0 { Some(finished.target_file.display().to_string()) } else { None };
                    let _ = send_json(&mut write, json!({
                        "type": "state",
                        "status": "finished",
                        "returncode": returncode,
                        "job_id": finished.job_id,
                        "result": result,
                    })).await;
                }
            }
            incoming = read.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        handle_command(&text, ctx, &mut job, &log_tx, &mut write).await?;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => return Err(WorkerError::WebSocket(err.to_string())),
                }
            }
        }
    }

    if let Some(mut job) = job.take() {
        let _ = job.child.start_kill();
    }
    Ok(())
}

async fn wait_job(job: Option<&mut Job>) -> std::io::Result<std::process::ExitStatus> {
    match job {
        Some(job) => job.child.wait().await,
        None => std::future::pending().await,
    }
}

type WsSink = futures_util::stream::SplitSink<WebSocketStream<TcpStream>, Message>;

async fn send_json(write: &mut WsSink, value: Value) -> Result<(), WorkerError> {
    write.send(Message::Text(value.to_string().into())).await.map_err(|e| WorkerError::WebSocket(e.to_string()))
}

async fn handle_command(
    text: &str,
    ctx: &WorkerContext,
    job: &mut Option<Job>,
    log_tx: &mpsc::UnboundedSender<String>,
    write: &mut WsSink,
) -> Result<(), WorkerError> {
    let value: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(_) => {
            let _ = send_json(write, json!({ "type": "state", "status": "error", "error": "Invalid JSON" })).await;
            return Ok(());
        }
    };

    match value.get("cmd").and_then(Value::as_str) {
        Some("start") => start_job(value, ctx, job, log_tx, write).await,
        Some("kill") => kill_job(job, write).await,
        _ => {
            send_json(write, json!({ "type": "state", "status": "error", "error": "Unknown command" })).await
        }
    }
}

fn parse_requests(value: &Value) -> Vec<Request> {
    match value.get("requests") {
        Some(v) if v.is_array() => serde_json::from_value(v.clone()).unwrap_or_default(),
        Some(v) => serde_json::from_value(v.clone()).map(|r| vec![r]).unwrap_or_default(),
        None => vec![Request::new()],
    }
}

fn parse_environ(value: &Value) -> HashMap<String, String> {
    value
        .get("environ")
        .and_then(Value::as_object)
        .map(|map| map.iter().filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string()))).collect())
        .unwrap_or_default()
}

const REQUIRED_ENVIRON_KEYS: &[&str] = &["request_id", "user_id", "namespace", "host", "username"];

async fn start_job(
    value: Value,
    ctx: &WorkerContext,
    job: &mut Option<Job>,
    log_tx: &mpsc::UnboundedSender<String>,
    write: &mut WsSink,
) -> Result<(), WorkerError> {
    let requests = parse_requests(&value);
    let environ = parse_environ(&value);
    let target_dir = value.get("target_dir").and_then(Value::as_str).unwrap_or("").trim_start_matches('/').to_string();

    let workdir = ctx.resolve_target(&target_dir);

    if !workdir.exists() {
        return send_json(write, json!({ "type": "state", "status": "error", "error": format!("Workdir {} does not exist", workdir.display()) })).await;
    }
    if let Some(missing) = REQUIRED_ENVIRON_KEYS.iter().find(|key| !environ.contains_key(**key)) {
        return send_json(write, json!({ "type": "state", "status": "error", "error": format!("Missing {missing} in environ") })).await;
    }

    let job_id = environ["request_id"].clone();
    let request_file = workdir.join(format!("{job_id}.mars"));
    let target_file = workdir.join("data.grib");

    if let Err(err) = write_script_file(&requests, &request_file, &target_file) {
        return send_json(write, json!({ "type": "state", "status": "error", "error": err.to_string() })).await;
    }

    send_json(write, json!({ "type": "state", "status": "started", "job_id": job_id })).await?;

    match spawn_under_pty(&ctx.mars_executable, &request_file, &workdir, log_tx.clone()) {
        Ok(child) => {
            *job = Some(Job { child, job_id, request_file, target_file });
            Ok(())
        }
        Err(err) => send_json(write, json!({ "type": "state", "status": "error", "error": err.to_string() })).await,
    }
}

fn write_script_file(requests: &[Request], request_file: &std::path::Path, target_file: &std::path::Path) -> std::io::Result<()> {
    let mut out = std::fs::File::create(request_file)?;
    let target = target_file.display().to_string();
    for request in requests {
        write_request_script(request, TargetSpec::Path(&target), &mut out).map_err(std::io::Error::other)?;
    }
    Ok(())
}

/// Spawn the extractor under a PTY so its log output arrives line-buffered
/// in real time rather than fully block-buffered, exactly the way the
/// original WebSocket engine does it (`pty.openpty()`); the master side is
/// handed to a dedicated blocking task that forwards each line onto
/// `log_tx`.
fn spawn_under_pty(
    executable: &str,
    request_file: &std::path::Path,
    workdir: &std::path::Path,
    log_tx: mpsc::UnboundedSender<String>,
) -> std::io::Result<Child> {
    let pty = nix::pty::openpty(None, None).map_err(|errno| std::io::Error::from_raw_os_error(errno as i32))?;

    let mut command = Command::new(executable);
    command
        .arg(request_file)
        .current_dir(workdir)
        .stdout(Stdio::from(pty.slave.try_clone()?))
        .stderr(Stdio::from(pty.slave));

    let child = command.spawn()?;

    let master_file = std::fs::File::from(pty.master);
    tokio::task::spawn_blocking(move || stream_pty_lines(master_file, log_tx));

    Ok(child)
}

fn stream_pty_lines(master: std::fs::File, log_tx: mpsc::UnboundedSender<String>) {
    use std::io::{BufRead, BufReader};
    let reader = BufReader::new(master);
    for line in reader.lines() {
        match line {
            Ok(line) => {
                if log_tx.send(line).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    }
}

async fn kill_job(job: &mut Option<Job>, write: &mut WsSink) -> Result<(), WorkerError> {
    match job.take() {
        Some(mut running) => {
            let _ = running.child.start_kill();
            let _ = tokio::fs::remove_file(&running.request_file).await;
            let _ = tokio::fs::remove_file(&running.target_file).await;
            send_json(write, json!({ "type": "state", "status": "killed", "job_id": running.job_id })).await
        }
        None => send_json(write, json!({ "type": "state", "status": "error", "error": "No running job" })).await,
    }
}
