// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace-level integration tests: these drive `mars-client` against
//! small hand-rolled fake workers speaking the real wire protocol over
//! real TCP sockets, so the cluster/session/transfer code is exercised
//! exactly the way it would be against a production worker, without
//! needing the process-forking HTTP engine (`mars-worker::run_http`,
//! unsound to run inside a test runtime's own tokio reactor) or a real
//! extractor binary on the test host.
//!
//! `cli_reports_failure_when_no_worker_is_reachable` drives the compiled
//! `mars` binary itself via `assert_cmd`, shelling out the way a CLI
//! integration spec would against a real binary.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use mars_client::{Cluster, RequestType, RetryPolicy};
use mars_config::Config;
use mars_core::{CacheEntry, CacheStatus, Request, RequestValue};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

fn req(pairs: &[(&str, &str)]) -> Request {
    let mut r = Request::new();
    for (k, v) in pairs {
        r.insert(*k, RequestValue::Scalar(v.to_string()));
    }
    r
}

/// Read a request line + headers + body off a fake-worker connection,
/// matching the subset of HTTP/1.1 the real worker (`mars-worker`) speaks.
struct FakeRequest {
    method: String,
    path: String,
    body: Vec<u8>,
}

async fn read_fake_request(stream: &mut TcpStream) -> FakeRequest {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line).await.expect("request line");
    let mut parts = line.trim_end().splitn(3, ' ');
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    loop {
        let mut header_line = String::new();
        reader.read_line(&mut header_line).await.expect("header line");
        let header_line = header_line.trim_end_matches(['\r', '\n']);
        if header_line.is_empty() {
            break;
        }
        if let Some((name, value)) = header_line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }

    let mut body = vec![0u8; content_length];
    if content_length > 0 {
        reader.read_exact(&mut body).await.expect("request body");
    }

    FakeRequest { method, path, body }
}

fn chunk(data: &[u8]) -> Vec<u8> {
    let mut out = format!("{:x}\r\n", data.len()).into_bytes();
    out.extend_from_slice(data);
    out.extend_from_slice(b"\r\n");
    out
}

// Every response below closes the connection rather than offering
// keep-alive: the real worker never reuses a connection either (one
// forked child handles exactly one request, see `mars-worker`'s
// `http::listener`), and forcing `Connection: close` here keeps this
// fake server's "one accept() per request" loop in lockstep with
// whichever connection reqwest actually sends the next request on.

async fn write_head_ok(stream: &mut TcpStream, shares: &[&str]) {
    let cache_config = json!({ "SHARES": shares }).to_string();
    let response = format!("HTTP/1.1 204 No Content\r\nConnection: close\r\nCACHE_CONFIG: {cache_config}\r\n\r\n");
    stream.write_all(response.as_bytes()).await.expect("write HEAD response");
}

async fn write_status_only(stream: &mut TcpStream, code: u16, reason: &str) {
    let response = format!("HTTP/1.1 {code} {reason}\r\nConnection: close\r\nContent-Length: 0\r\n\r\n");
    stream.write_all(response.as_bytes()).await.expect("write status response");
}

async fn write_x_data(stream: &mut TcpStream, entry: &CacheEntry) {
    let data = serde_json::to_string(entry).expect("serialize entry");
    let response = format!("HTTP/1.1 200 OK\r\nConnection: close\r\nX-MARS-UID: fake-uid\r\nContent-Type: application/json\r\nX-DATA: {data}\r\n\r\n{data}");
    stream.write_all(response.as_bytes()).await.expect("write X-DATA response");
}

async fn write_chunked_artifact(stream: &mut TcpStream, payload: &[u8]) {
    let head = "HTTP/1.1 200 OK\r\nConnection: close\r\nX-MARS-UID: fake-uid\r\nContent-Type: application/binary\r\nTransfer-Encoding: chunked\r\n\r\n";
    stream.write_all(head.as_bytes()).await.expect("write chunked head");
    stream.write_all(&chunk(payload)).await.expect("write payload chunk");
    stream.write_all(&chunk(b"ENDR")).await.expect("write ENDR sentinel");
    stream.write_all(b"0\r\n\r\n").await.expect("write final chunk");
}

/// Best-effort GET/DELETE teardown: any 404 is fine, the client never
/// inspects the result.
async fn write_not_found(stream: &mut TcpStream) {
    let _ = write_status_only(stream, 404, "Not Found").await;
}

async fn bind_loopback() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind fake worker");
    let addr = listener.local_addr().expect("local addr");
    (listener, addr)
}

/// Worker list `[A, B]`, A always answers `POST` with a
/// transient 503, B succeeds with a COMPLETED entry pointing at a locally
/// reachable artifact. The cluster must fail over to B rather than
/// exhausting retries against A (`RetryPolicy { retries: 1, .. }` below
/// makes the same-host loop give up on the first 503 instead of waiting
/// out the default 10s inter-attempt delay).
#[tokio::test]
async fn failover_moves_to_the_next_host_after_a_retryable_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let share_dir = dir.path().join("share-a").join("mars");
    std::fs::create_dir_all(&share_dir).expect("mkdir share");
    let fingerprint = "a".repeat(32);
    std::fs::write(share_dir.join(format!("{fingerprint}.grib")), b"artifact-bytes").expect("write artifact");

    let (listener_a, addr_a) = bind_loopback().await;
    let (listener_b, addr_b) = bind_loopback().await;

    let server_a = tokio::spawn(async move {
        let (mut stream, _) = listener_a.accept().await.expect("accept on A");
        let head = read_fake_request(&mut stream).await;
        assert_eq!(head.method, "HEAD");
        write_head_ok(&mut stream, &["share-a"]).await;

        let (mut stream, _) = listener_a.accept().await.expect("accept POST on A");
        let post = read_fake_request(&mut stream).await;
        assert_eq!(post.method, "POST");
        write_status_only(&mut stream, 503, "Service Unavailable").await;
    });

    let server_b = tokio::spawn(async move {
        let (mut stream, _) = listener_b.accept().await.expect("accept on B");
        let head = read_fake_request(&mut stream).await;
        assert_eq!(head.method, "HEAD");
        write_head_ok(&mut stream, &["share-a"]).await;

        let (mut stream, _) = listener_b.accept().await.expect("accept POST on B");
        let post = read_fake_request(&mut stream).await;
        assert_eq!(post.method, "POST");

        let entry = CacheEntry {
            status: CacheStatus::Completed,
            host: "worker-b".to_string(),
            share: "share-a".to_string(),
            target: format!("/remote-root/share-a/mars/{fingerprint}.grib"),
            size: Some(14),
            access: 1,
            message: None,
        };
        write_x_data(&mut stream, &entry).await;

        let (mut stream, _) = listener_b.accept().await.expect("accept teardown GET on B");
        read_fake_request(&mut stream).await;
        write_not_found(&mut stream).await;

        let (mut stream, _) = listener_b.accept().await.expect("accept teardown DELETE on B");
        read_fake_request(&mut stream).await;
        write_not_found(&mut stream).await;
    });

    let mut config = Config::default();
    config.cache_root = dir.path().to_string_lossy().into_owned();
    config.cache_folder = "mars".to_string();
    config.shares = vec!["share-a".to_string()];

    let http = reqwest::Client::new();
    let urls = vec![format!("http://{addr_a}"), format!("http://{addr_b}")];
    let cluster = Cluster::new(
        http,
        urls,
        config,
        RequestType::File,
        RetryPolicy { retries: 1, delay: Duration::from_millis(1) },
        Duration::from_secs(5),
    );

    let request = req(&[("class", "ea"), ("date", "2024-09-08")]);
    let target = dir.path().join("downloaded.grib");
    let result = cluster.execute(&request, &HashMap::new(), &target).await;

    assert!(!result.is_error(), "expected success, got {result:?}");
    let entry = result.data.expect("completed entry");
    assert_eq!(entry.status, CacheStatus::Completed);
    assert_eq!(entry.host, "worker-b");

    server_a.await.expect("server A task");
    server_b.await.expect("server B task");
}

/// A two-element batch against one worker, pipe mode. Each element is
/// posted as its own session; the worker streams
/// back that element's bytes as a chunked artifact terminated by `ENDR`.
/// The cluster client must merge sub-requests (later keys win) and
/// concatenate the two artifacts into one file in order.
#[tokio::test]
async fn batched_requests_append_sequential_output_to_one_target_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (listener, addr) = bind_loopback().await;

    let server = tokio::spawn(async move {
        for payload in [&b"first-chunk-"[..], &b"second-chunk"[..]] {
            let (mut stream, _) = listener.accept().await.expect("accept HEAD");
            let head = read_fake_request(&mut stream).await;
            assert_eq!(head.method, "HEAD");
            write_head_ok(&mut stream, &["share-a"]).await;

            let (mut stream, _) = listener.accept().await.expect("accept POST");
            let post = read_fake_request(&mut stream).await;
            assert_eq!(post.method, "POST");
            write_chunked_artifact(&mut stream, payload).await;

            let (mut stream, _) = listener.accept().await.expect("accept teardown GET");
            read_fake_request(&mut stream).await;
            write_not_found(&mut stream).await;

            let (mut stream, _) = listener.accept().await.expect("accept teardown DELETE");
            read_fake_request(&mut stream).await;
            write_not_found(&mut stream).await;
        }
    });

    let mut config = Config::default();
    config.shares = vec!["share-a".to_string()];

    let http = reqwest::Client::new();
    let cluster = Cluster::new(
        http,
        vec![format!("http://{addr}")],
        config,
        RequestType::Pipe,
        RetryPolicy { retries: 1, delay: Duration::from_millis(1) },
        Duration::from_secs(5),
    );

    let batch = vec![req(&[("class", "ea"), ("date", "2024-09-08")]), req(&[("time", "12:00:00")])];
    let target = dir.path().join("batched.grib");
    let result = cluster.execute_batch(&batch, &HashMap::new(), &target).await;

    assert!(!result.is_error(), "expected success, got {result:?}");
    let contents = std::fs::read(&target).expect("read target file");
    assert_eq!(contents, b"first-chunk-second-chunk");

    server.await.expect("server task");
}

/// The CLI binary's own failure path: with no reachable worker in
/// the server list, `mars client` exits non-zero and the failure message
/// names the transport error rather than silently succeeding.
#[test]
fn cli_reports_failure_when_no_worker_is_reachable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let request_path = dir.path().join("req.json");
    std::fs::write(&request_path, r#"{"class":"ea","date":"2024-09-08"}"#).expect("write request file");

    let server_list_path = dir.path().join("server.list");
    std::fs::write(&server_list_path, "http://127.0.0.1:1\n").expect("write server list");

    let mut cmd = assert_cmd::Command::cargo_bin("mars").expect("find mars binary");
    cmd.arg("client")
        .arg(&request_path)
        .arg("--target")
        .arg(dir.path().join("out.grib"))
        .arg("--server-list")
        .arg(&server_list_path)
        .env("MARS_CONFIG_FILE", dir.path().join("nonexistent.yaml"));

    cmd.assert().failure();
}
