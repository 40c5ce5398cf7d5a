// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use mars_config::Config;
use mars_core::Request;
use rand::seq::SliceRandom;

use crate::result::SessionResult;
use crate::session::{ClientSession, RequestType};
use crate::transfer::OpenMode;

/// Retry knobs for the single-host path: up to `retries` attempts
/// against the same host, sleeping `delay` between them.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy { retries: 3, delay: Duration::from_secs(10) }
    }
}

/// A cluster of worker URLs tried in random order, with same-host retry
/// before moving on.
pub struct Cluster {
    http: reqwest::Client,
    urls: Vec<String>,
    config: Config,
    request_type: RequestType,
    retry: RetryPolicy,
    timeout: Duration,
}

impl Cluster {
    pub fn new(http: reqwest::Client, urls: Vec<String>, config: Config, request_type: RequestType, retry: RetryPolicy, timeout: Duration) -> Self {
        Cluster { http, urls, config, request_type, retry, timeout }
    }

    /// Single-request input: shuffle the host list,
    /// run the single-host path against each, stop at the first
    /// reply without an error, otherwise continue on `retry_next_host`.
    /// If every host is exhausted, the last reply is returned as-is.
    pub async fn execute(&self, request: &Request, environ: &HashMap<String, String>, target: &Path) -> SessionResult {
        self.execute_with_mode(request, environ, target, OpenMode::Write, 0).await
    }

    async fn execute_with_mode(&self, request: &Request, environ: &HashMap<String, String>, target: &Path, open_mode: OpenMode, position: u64) -> SessionResult {
        let mut hosts = self.urls.clone();
        hosts.shuffle(&mut rand::thread_rng());

        let mut last = SessionResult::fatal("no worker hosts configured");
        for url in &hosts {
            let reply = self.run_single_host(url, request, environ, target, open_mode, position).await;
            if !reply.is_error() {
                return reply;
            }
            if !reply.retry_next_host {
                return reply;
            }
            tracing::warn!(url, message = %reply.message, "retrying on the next host");
            last = reply;
        }
        last
    }

    /// Batched input: `requests` is an ordered list of
    /// sub-requests. Each is merged onto a running accumulator (later
    /// keys overwrite earlier ones) and executed against the same target
    /// file; the first sub-request opens the file fresh, later ones
    /// append starting at the file's current size. On the first failing
    /// element, the accumulated per-element messages (joined by
    /// newlines) replace the failing reply's message.
    pub async fn execute_batch(&self, requests: &[Request], environ: &HashMap<String, String>, target: &Path) -> SessionResult {
        let mut accumulator = Request::new();
        let mut messages = Vec::new();
        let mut open_mode = OpenMode::Write;
        let mut position = 0u64;
        let mut last = SessionResult::fatal("empty batch");

        for element in requests {
            accumulator.merge(element);

            let result = self.execute_with_mode(&accumulator, environ, target, open_mode, position).await;
            messages.push(result.message.clone());

            if result.is_error() {
                let mut failed = result;
                failed.message = messages.join("\n");
                return failed;
            }

            position = tokio::fs::metadata(target).await.map(|m| m.len()).unwrap_or(position);
            open_mode = OpenMode::Append;
            last = result;
        }

        last.message = messages.join("\n");
        last
    }

    /// Single-host path: run the session up to `retry.retries`
    /// times, sleeping `retry.delay` between attempts, stopping as soon
    /// as either there is no error or the error is not flagged
    /// `retry_same_host`.
    async fn run_single_host(&self, url: &str, request: &Request, environ: &HashMap<String, String>, target: &Path, open_mode: OpenMode, position: u64) -> SessionResult {
        let session = ClientSession::new(self.http.clone(), url, self.config.clone(), self.request_type, self.timeout);

        let mut reply = SessionResult::fatal("no attempts made");
        for attempt in 0..self.retry.retries.max(1) {
            reply = session.execute(request, environ, target, open_mode, position).await;
            if !reply.is_error() {
                return reply;
            }
            if !reply.retry_same_host {
                return reply;
            }
            tracing::warn!(url, attempt, message = %reply.message, "retrying on the same host");
            if attempt + 1 < self.retry.retries {
                tokio::time::sleep(self.retry.delay).await;
            }
        }
        reply
    }
}

#[cfg(test)]
#[path = "cluster_tests.rs"]
mod tests;
