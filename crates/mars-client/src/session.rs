// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use mars_core::{CacheEntry, CacheStatus, Request};
use mars_config::Config;
use serde::Deserialize;

use crate::error::ClientError;
use crate::result::SessionResult;
use crate::transfer::{self, OpenMode};

/// `type` field of the POST body: whether the worker streams the
/// artifact inline (pipe) or writes it to a shared filesystem and hands
/// back a pointer (file).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    File,
    Pipe,
}

impl RequestType {
    fn as_str(self) -> &'static str {
        match self {
            RequestType::File => "file",
            RequestType::Pipe => "pipe",
        }
    }
}

/// How long to sleep before re-polling a QUEUED/RUNNING entry. Matches
/// the 0.5s interval the reference client uses.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Bound on the number of polling re-executions within a single
/// `execute()` call, so a worker that never transitions out of
/// QUEUED/RUNNING cannot wedge the session forever. Not present in the
/// original (its recursive `return` after one sleep effectively polls
/// once per cluster retry instead); this cap only prevents a runaway
/// loop and is far above any real extraction's queue time.
const MAX_POLLS: u32 = 600;

/// One attempt against one worker URL. A session is single-use: build
/// one per attempt.
pub struct ClientSession {
    http: reqwest::Client,
    url: String,
    config: Config,
    request_type: RequestType,
    timeout: Duration,
}

impl ClientSession {
    pub fn new(http: reqwest::Client, url: impl Into<String>, config: Config, request_type: RequestType, timeout: Duration) -> Self {
        ClientSession { http, url: url.into(), config, request_type, timeout }
    }

    /// Run the session once against `request`/`environ`, writing a pipe-
    /// mode artifact (if any) to `target` starting at `(open_mode,
    /// position)`. Always performs the best-effort GET/DELETE
    /// teardown of the uid log before returning.
    pub async fn execute(&self, request: &Request, environ: &HashMap<String, String>, target: &Path, open_mode: OpenMode, position: u64) -> SessionResult {
        let mut polls = 0u32;
        loop {
            match self.attempt(request, environ, target, open_mode, position).await {
                Attempt::Done(result) => return result,
                Attempt::Poll(uid) => {
                    polls += 1;
                    if polls >= MAX_POLLS {
                        return self.teardown(uid, SessionResult::retry_same_host("gave up waiting for the extraction to leave QUEUED/RUNNING")).await;
                    }
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
            }
        }
    }

    async fn attempt(&self, request: &Request, environ: &HashMap<String, String>, target: &Path, open_mode: OpenMode, position: u64) -> Attempt {
        if let Err(result) = self.check_shares().await {
            return Attempt::Done(result);
        }

        let body = serde_json::json!({
            "request": request,
            "environ": environ,
            "type": self.request_type.as_str(),
        });

        let response = match self.http.post(&self.url).timeout(self.timeout).json(&body).send().await {
            Ok(r) => r,
            Err(e) => return Attempt::Done(SessionResult::retry_next_host(format!("transport error: {e}"))),
        };

        let status = response.status();
        let uid = response.headers().get("X-MARS-UID").and_then(|v| v.to_str().ok()).map(str::to_string);

        if status.as_u16() == 400 {
            let exit_code = response.headers().get("X-MARS-EXIT-CODE").and_then(|v| v.to_str().ok()).and_then(|v| v.parse::<i32>().ok());
            let message = response.text().await.unwrap_or_default();
            let result = SessionResult::fatal(message).with_uid(uid.clone()).with_exit_code(exit_code);
            return Attempt::Done(self.teardown(uid, result).await);
        }

        if !status.is_success() {
            let (default_same, default_next) = Self::default_retry_for_status(status.as_u16());
            let retry_same_host = Self::header_bool(&response, "X-MARS-RETRY-SAME-HOST").unwrap_or(default_same);
            let retry_next_host = Self::header_bool(&response, "X-MARS-RETRY-NEXT-HOST").unwrap_or(default_next) || retry_same_host;
            let message = response.text().await.unwrap_or_default();

            let result = SessionResult {
                message,
                retry_same_host,
                retry_next_host,
                data: None,
                uid: uid.clone(),
                exit_code: None,
                error: true,
            };
            return Attempt::Done(self.teardown(uid, result).await);
        }

        // 200 OK: either an X-DATA pointer (file mode) or a chunked
        // binary body (pipe mode).
        if let Some(data_header) = response.headers().get("X-DATA").cloned() {
            let data_str = match data_header.to_str() {
                Ok(s) => s.to_string(),
                Err(_) => return Attempt::Done(self.teardown(uid, SessionResult::retry_same_host("malformed X-DATA header")).await),
            };
            let entry: CacheEntry = match serde_json::from_str(&data_str) {
                Ok(e) => e,
                Err(e) => return Attempt::Done(self.teardown(uid, SessionResult::retry_same_host(format!("malformed X-DATA: {e}"))).await),
            };

            match entry.status {
                CacheStatus::Queued | CacheStatus::Running => return Attempt::Poll(uid),
                CacheStatus::Completed => {
                    let result = match mars_config::local_target(&entry, &self.config) {
                        Ok(mars_config::LocalTarget::Local(path)) if path.exists() => SessionResult::success(entry, uid.clone()),
                        Ok(mars_config::LocalTarget::Local(path)) => SessionResult::retry_next_host(format!("completed entry missing at {}", path.display())),
                        Ok(mars_config::LocalTarget::Mirror(url)) => match self.http.head(&url).timeout(self.timeout).send().await {
                            Ok(r) if r.status().is_success() => SessionResult::success(entry, uid.clone()),
                            Ok(r) => SessionResult::retry_next_host(format!("mirror {url} returned {}", r.status())),
                            Err(e) => SessionResult::retry_next_host(format!("mirror {url} unreachable: {e}")),
                        },
                        Err(e) => SessionResult::retry_next_host(format!("no reachable copy of completed entry: {e}")),
                    };
                    return Attempt::Done(self.teardown(uid, result).await);
                }
                CacheStatus::Failed => {
                    let message = entry.message.clone().unwrap_or_else(|| "extraction failed".to_string());
                    let result = SessionResult::retry_next_host(message).with_uid(uid.clone());
                    return Attempt::Done(self.teardown(uid, result).await);
                }
            }
        }

        let body_stream = response.bytes_stream();
        match transfer::run(body_stream, target, open_mode, position).await {
            Ok(_outcome) => {
                let result = SessionResult { uid: uid.clone(), ..SessionResult::default() };
                Attempt::Done(self.teardown(uid, result).await)
            }
            Err(ClientError::Extractor { message, retry_same_host, retry_next_host }) => {
                let result = SessionResult { message, retry_same_host, retry_next_host, data: None, uid: uid.clone(), exit_code: None, error: true };
                Attempt::Done(self.teardown(uid, result).await)
            }
            Err(other) => Attempt::Done(self.teardown(uid, SessionResult::retry_same_host(other.to_string())).await),
        }
    }

    /// HEAD the worker and confirm its published `CACHE_CONFIG` covers
    /// every share this client is configured to use.
    async fn check_shares(&self) -> Result<(), SessionResult> {
        let response = self
            .http
            .head(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| SessionResult::retry_next_host(format!("HEAD {} failed: {e}", self.url)))?;

        let raw = response.headers().get("CACHE_CONFIG").and_then(|v| v.to_str().ok()).unwrap_or("{}");

        #[derive(Deserialize, Default)]
        struct CacheConfig {
            #[serde(rename = "SHARES", default)]
            shares: Vec<String>,
        }

        let remote: CacheConfig = serde_json::from_str(raw).unwrap_or_default();
        let covers_all = self.config.shares.iter().all(|s| remote.shares.contains(s));
        if remote.shares.is_empty() || !covers_all {
            return Err(SessionResult::retry_next_host(format!(
                "worker {} does not publish all configured shares (remote={:?}, local={:?})",
                self.url, remote.shares, self.config.shares
            )));
        }
        Ok(())
    }

    fn default_retry_for_status(code: u16) -> (bool, bool) {
        let retry_same_host = matches!(code, 500 | 502 | 503 | 504 | 408);
        let retry_next_host = code == 429;
        (retry_same_host, retry_next_host)
    }

    fn header_bool(response: &reqwest::Response, name: &str) -> Option<bool> {
        response.headers().get(name).and_then(|v| v.to_str().ok()).and_then(|v| v.parse::<i32>().ok()).map(|v| v != 0)
    }

    /// Best-effort GET (to surface the final log in the message) then
    /// DELETE of `/uid`; neither failure changes the outcome.
    async fn teardown(&self, uid: Option<String>, mut result: SessionResult) -> SessionResult {
        let Some(uid) = uid else { return result };
        result.uid = Some(uid.clone());

        let log_url = format!("{}/{uid}", self.url.trim_end_matches('/'));
        if let Ok(response) = self.http.get(&log_url).timeout(self.timeout).send().await {
            if response.status().is_success() {
                if let Ok(text) = response.text().await {
                    if !text.is_empty() {
                        result.message = text;
                    }
                }
            }
        }

        let _ = self.http.delete(&log_url).timeout(self.timeout).send().await;
        result
    }
}

enum Attempt {
    Done(SessionResult),
    Poll(Option<String>),
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
