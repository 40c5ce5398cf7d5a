// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use mars_core::CacheEntry;

/// The outcome of a single session attempt: the session never retries
/// on its own, it only reports what happened and lets the cluster
/// client decide.
#[derive(Debug, Clone, Default)]
pub struct SessionResult {
    pub message: String,
    pub retry_same_host: bool,
    pub retry_next_host: bool,
    pub data: Option<CacheEntry>,
    pub uid: Option<String>,
    pub exit_code: Option<i32>,
    /// Set explicitly by the success/failure constructors. A populated
    /// `message` does not imply failure — `teardown` fills it in from
    /// the worker's log on the success path too.
    pub error: bool,
}

impl SessionResult {
    pub fn is_error(&self) -> bool {
        self.error
    }

    pub fn success(data: CacheEntry, uid: Option<String>) -> Self {
        SessionResult { message: String::new(), retry_same_host: false, retry_next_host: false, data: Some(data), uid, exit_code: None, error: false }
    }

    pub fn retry_next_host(message: impl Into<String>) -> Self {
        SessionResult { message: message.into(), retry_same_host: false, retry_next_host: true, data: None, uid: None, exit_code: None, error: true }
    }

    pub fn retry_same_host(message: impl Into<String>) -> Self {
        SessionResult { message: message.into(), retry_same_host: true, retry_next_host: false, data: None, uid: None, exit_code: None, error: true }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        SessionResult { message: message.into(), retry_same_host: false, retry_next_host: false, data: None, uid: None, exit_code: None, error: true }
    }

    pub fn with_uid(mut self, uid: Option<String>) -> Self {
        self.uid = uid;
        self
    }

    pub fn with_exit_code(mut self, code: Option<i32>) -> Self {
        self.exit_code = code;
        self
    }
}
