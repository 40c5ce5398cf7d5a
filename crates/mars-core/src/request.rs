// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::BTreeMap;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

/// A single value in a request: a scalar or an ordered list of scalars.
///
/// MARS requests accept both forms (`param: "140212"` and
/// `param: ["140212", "140228"]`); both are carried through untouched to the
/// extractor's request script via the encoder in `mars-wire`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestValue {
    Scalar(String),
    List(Vec<String>),
}

impl RequestValue {
    pub fn as_list(&self) -> Vec<&str> {
        match self {
            RequestValue::Scalar(s) => vec![s.as_str()],
            RequestValue::List(items) => items.iter().map(String::as_str).collect(),
        }
    }
}

/// An unordered mapping of request keys to values, with an optional
/// `target` naming a destination path meaningful only to the extractor.
///
/// Backed by a `BTreeMap` so key order is always lexicographic — this is
/// what makes the canonical encoding in [`Request::canonical`] deterministic
/// without an extra sort step.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Request(BTreeMap<String, RequestValue>);

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: BTreeMap<String, RequestValue>) -> Self {
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&RequestValue> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: RequestValue) {
        self.0.insert(key.into(), value);
    }

    /// Later keys overwrite earlier ones — used by the cluster client to
    /// merge a batch of sub-requests into one accumulator request.
    pub fn merge(&mut self, other: &Request) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn target(&self) -> Option<&str> {
        match self.0.get("target") {
            Some(RequestValue::Scalar(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn set_target(&mut self, target: impl Into<String>) {
        self.0.insert("target".to_string(), RequestValue::Scalar(target.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RequestValue)> {
        self.0.iter()
    }

    /// Remove `target` and produce the canonical form used for fingerprinting.
    pub fn canonical(&self) -> CanonicalRequest {
        let mut map = self.0.clone();
        map.remove("target");
        CanonicalRequest(map)
    }

    /// Content-address this request: see [`CanonicalRequest::fingerprint`].
    ///
    /// Two requests produce the same fingerprint iff their canonical
    /// encodings are byte-identical.
    pub fn fingerprint(&self) -> String {
        self.canonical().fingerprint()
    }
}

/// The request with `target` removed, ready for deterministic encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRequest(BTreeMap<String, RequestValue>);

impl CanonicalRequest {
    /// Serialize as compact, sorted-key JSON — `BTreeMap` iterates in key
    /// order, and `serde_json`'s compact writer emits no extraneous
    /// whitespace, so this is already the minimal-whitespace, sorted-at-
    /// every-level encoding a stable fingerprint needs (request values
    /// never nest beyond one level, so there is nothing deeper to sort).
    pub fn encode(&self) -> String {
        // unwrap_used is denied; RequestValue only contains String/Vec<String>,
        // which always serialize successfully.
        serde_json::to_string(&self.0).unwrap_or_default()
    }

    /// 32-character lowercase hex digest of the canonical encoding.
    ///
    /// The original implementation this system is modeled on hashes with
    /// MD5; this port matches it bit-for-bit (see DESIGN.md) — the digest
    /// is used purely as a content address, never as a security boundary.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Md5::new();
        hasher.update(self.encode().as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
