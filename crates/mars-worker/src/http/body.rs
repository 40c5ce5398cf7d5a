// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;

use mars_core::Request;
use serde_json::Value;

use crate::error::WorkerError;

/// The decoded body of `POST /`: `{request, environ, type?}`. `type`
/// defaults to `"file"`, matching the reference worker's
/// `data.get("type", "file")`.
pub struct PostBody {
    pub requests: Vec<Request>,
    pub environ: HashMap<String, String>,
    pub pipe_mode: bool,
}

pub fn parse(body: &[u8]) -> Result<PostBody, WorkerError> {
    let value: Value = serde_json::from_slice(body)?;

    let request_value = value.get("request").ok_or(WorkerError::MissingField("request"))?;
    let requests: Vec<Request> = if request_value.is_array() {
        serde_json::from_value(request_value.clone())?
    } else {
        vec![serde_json::from_value(request_value.clone())?]
    };

    let environ = value
        .get("environ")
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default();

    let pipe_mode = value.get("type").and_then(Value::as_str) == Some("pipe");

    Ok(PostBody { requests, environ, pipe_mode })
}

#[cfg(test)]
#[path = "body_tests.rs"]
mod tests;
