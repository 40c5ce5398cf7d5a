// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::io;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::WorkerError;

/// The request line plus headers of an HTTP/1.1 request, read off the wire
/// by [`read_request_head`]. Bodies are read separately via
/// [`read_body`] once the caller knows how many bytes `Content-Length`
/// names.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: String,
    pub path: String,
    headers: HashMap<String, String>,
}

impl RequestHead {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn content_length(&self) -> usize {
        self.header("content-length").and_then(|v| v.parse().ok()).unwrap_or(0)
    }
}

/// Read a request line and headers terminated by a blank line. This worker
/// speaks HTTP/1.1 directly rather than going through `hyper`/`axum`: the
/// one-process-per-connection forking model forks a live process per
/// accepted connection, which is unsound to do underneath a shared,
/// multi-connection async runtime (see DESIGN.md).
pub async fn read_request_head<R: AsyncRead + Unpin>(reader: &mut tokio::io::BufReader<R>) -> Result<RequestHead, WorkerError> {
    let mut request_line = String::new();
    let n = reader.read_line(&mut request_line).await?;
    if n == 0 {
        return Err(WorkerError::MalformedHttp("connection closed before a request line was sent".into()));
    }
    let mut parts = request_line.trim_end().splitn(3, ' ');
    let method = parts.next().ok_or_else(|| WorkerError::MalformedHttp("missing method".into()))?.to_string();
    let path = parts.next().ok_or_else(|| WorkerError::MalformedHttp("missing path".into()))?.to_string();

    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).await?;
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    Ok(RequestHead { method, path, headers })
}

pub async fn read_body<R: AsyncRead + Unpin>(reader: &mut R, content_length: usize) -> io::Result<Vec<u8>> {
    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).await?;
    Ok(body)
}

fn reason_phrase(code: u16) -> &'static str {
    match code {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        408 => "Request Timeout",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Unknown",
    }
}

/// Render a status line plus headers, terminated by the blank line that
/// separates headers from body. Callers write the body (if any) themselves.
pub fn format_headers(code: u16, headers: &[(&str, String)]) -> String {
    let mut out = format!("HTTP/1.1 {} {}\r\n", code, reason_phrase(code));
    for (name, value) in headers {
        out.push_str(name);
        out.push_str(": ");
        out.push_str(value);
        out.push_str("\r\n");
    }
    out.push_str("\r\n");
    out
}

pub async fn write_headers<W: AsyncWrite + Unpin>(writer: &mut W, code: u16, headers: &[(&str, String)]) -> io::Result<()> {
    writer.write_all(format_headers(code, headers).as_bytes()).await
}

/// Frame a chunked-transfer-encoding chunk: hex length, CRLF, data, CRLF.
pub fn encode_chunk(data: &[u8]) -> Vec<u8> {
    let mut out = format!("{:x}\r\n", data.len()).into_bytes();
    out.extend_from_slice(data);
    out.extend_from_slice(b"\r\n");
    out
}

pub const FINAL_CHUNK: &[u8] = b"0\r\n\r\n";

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
