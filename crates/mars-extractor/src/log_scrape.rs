// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"Transfering (\d+) bytes").expect("static regex is valid"))
}

/// Scrape the expected artifact size out of the extractor's combined
/// stdout/stderr log by matching `Transfering (\d+) bytes`, the line the
/// extractor itself emits once it knows how much it will write. Returns
/// `None` if the file is absent or the line hasn't appeared yet.
pub fn scrape_expected_size(log_path: &Path) -> Option<u64> {
    let contents = std::fs::read_to_string(log_path).ok()?;
    pattern().captures(&contents)?.get(1)?.as_str().parse().ok()
}

/// Poll the log file until the expected size appears or `timeout`
/// elapses. The worker's file-mode handler uses this with a ~40s bound
///: if it times out, the caller responds with the still-
/// `QUEUED` entry and lets the client poll.
pub async fn wait_for_expected_size(log_path: &Path, poll_interval: Duration, timeout: Duration) -> Option<u64> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Some(size) = scrape_expected_size(log_path) {
            return Some(size);
        }
        if tokio::time::Instant::now() >= deadline {
            return None;
        }
        tokio::time::sleep(poll_interval).await;
    }
}

#[cfg(test)]
#[path = "log_scrape_tests.rs"]
mod tests;
