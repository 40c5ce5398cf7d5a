// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use mars_core::CacheEntry;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::error::CacheError;
use crate::index::CacheIndex;

/// A minimal memcached text-protocol client speaking directly to the
/// `MEMCACHED` endpoint list from config — the real external
/// key-value store this system assumes is memcached, so this talks its
/// wire format over `tokio::net::TcpStream` rather than going through a
/// generic KV abstraction.
///
/// Endpoint selection for a given fingerprint uses rendezvous (highest
/// random weight) hashing across the configured endpoint list, the same
/// per-key node routing `pymemcache.client.hash.HashClient` performs:
/// repeated gets/sets of the same fingerprint always land on the same
/// node without requiring the nodes to coordinate a consistent-hash ring
/// among themselves.
pub struct MemcachedIndex {
    endpoints: Vec<String>,
}

impl MemcachedIndex {
    pub fn new(endpoints: Vec<String>) -> Self {
        MemcachedIndex { endpoints }
    }

    fn endpoint_for(&self, key: &str) -> Result<&str, CacheError> {
        self.endpoints
            .iter()
            .max_by_key(|endpoint| weight(endpoint, key))
            .map(String::as_str)
            .ok_or(CacheError::NoEndpoints)
    }

    async fn connect(&self, endpoint: &str) -> Result<TcpStream, CacheError> {
        TcpStream::connect(endpoint).await.map_err(|source| CacheError::Connect {
            endpoint: endpoint.to_string(),
            source,
        })
    }
}

fn weight(endpoint: &str, key: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    endpoint.hash(&mut hasher);
    key.hash(&mut hasher);
    hasher.finish()
}

#[async_trait]
impl CacheIndex for MemcachedIndex {
    async fn get(&self, fingerprint: &str) -> Result<Option<CacheEntry>, CacheError> {
        let endpoint = self.endpoint_for(fingerprint)?;
        let stream = self.connect(endpoint).await?;
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        write_half
            .write_all(format!("get {fingerprint}\r\n").as_bytes())
            .await?;

        let mut line = String::new();
        reader.read_line(&mut line).await?;

        if line.starts_with("END") {
            return Ok(None);
        }

        if !line.starts_with("VALUE") {
            return Err(CacheError::Protocol {
                endpoint: endpoint.to_string(),
                detail: format!("unexpected reply to GET: {}", line.trim_end()),
            });
        }

        let len: usize = line
            .split_whitespace()
            .nth(3)
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| CacheError::Protocol {
                endpoint: endpoint.to_string(),
                detail: format!("malformed VALUE header: {}", line.trim_end()),
            })?;

        let mut body = vec![0u8; len];
        tokio::io::AsyncReadExt::read_exact(&mut reader, &mut body).await?;

        // Consume the trailing "\r\n" after the value and the "END\r\n" terminator.
        let mut trailer = String::new();
        reader.read_line(&mut trailer).await?;
        let mut end = String::new();
        reader.read_line(&mut end).await?;

        let entry: CacheEntry = serde_json::from_slice(&body).map_err(|source| CacheError::Malformed {
            fingerprint: fingerprint.to_string(),
            source,
        })?;
        Ok(Some(entry))
    }

    async fn set(&self, fingerprint: &str, entry: &CacheEntry) -> Result<(), CacheError> {
        let endpoint = self.endpoint_for(fingerprint)?;
        let mut stream = self.connect(endpoint).await?;

        let body = serde_json::to_vec(entry).map_err(|source| CacheError::Malformed {
            fingerprint: fingerprint.to_string(),
            source,
        })?;

        stream
            .write_all(format!("set {fingerprint} 0 0 {}\r\n", body.len()).as_bytes())
            .await?;
        stream.write_all(&body).await?;
        stream.write_all(b"\r\n").await?;

        let mut reader = BufReader::new(stream);
        let mut reply = String::new();
        reader.read_line(&mut reply).await?;

        if !reply.starts_with("STORED") {
            return Err(CacheError::Protocol {
                endpoint: endpoint.to_string(),
                detail: format!("SET not acknowledged: {}", reply.trim_end()),
            });
        }
        Ok(())
    }

    async fn delete(&self, fingerprint: &str) -> Result<(), CacheError> {
        let endpoint = self.endpoint_for(fingerprint)?;
        let mut stream = self.connect(endpoint).await?;

        stream
            .write_all(format!("delete {fingerprint}\r\n").as_bytes())
            .await?;

        let mut reader = BufReader::new(stream);
        let mut reply = String::new();
        reader.read_line(&mut reply).await?;

        if !reply.starts_with("DELETED") && !reply.starts_with("NOT_FOUND") {
            return Err(CacheError::Protocol {
                endpoint: endpoint.to_string(),
                detail: format!("DELETE not acknowledged: {}", reply.trim_end()),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "memcached_tests.rs"]
mod tests;
