// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

/// A 4-byte out-of-band marker interleaved with a pipe-mode transfer's
/// binary chunks. A chunk that is exactly 4 bytes and matches one
/// of these is control, not data; every other chunk — 4 bytes or not —
/// is artifact payload to append to the target file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentinel {
    /// Rewind: discard everything written so far and start the target
    /// file over. The extractor emits this when it restarts a retrieval
    /// mid-stream.
    Rwnd,
    /// End of record: the transfer completed successfully. A transfer
    /// that ends without this chunk ever appearing is itself an error.
    Endr,
    /// The next chunk is a JSON error descriptor instead of payload.
    Eror,
}

impl Sentinel {
    pub const RWND: &'static [u8; 4] = b"RWND";
    pub const ENDR: &'static [u8; 4] = b"ENDR";
    pub const EROR: &'static [u8; 4] = b"EROR";

    /// Classify a chunk. Only exactly-4-byte chunks can be control; an
    /// unrecognized 4-byte chunk is a protocol error for the caller to
    /// raise, not data — callers must check chunk length separately
    /// to tell "not a sentinel" apart from "not 4 bytes long".
    pub fn parse(chunk: &[u8]) -> Option<Sentinel> {
        if chunk.len() != 4 {
            return None;
        }
        match chunk {
            b"RWND" => Some(Sentinel::Rwnd),
            b"ENDR" => Some(Sentinel::Endr),
            b"EROR" => Some(Sentinel::Eror),
            _ => None,
        }
    }

    pub fn as_bytes(self) -> &'static [u8; 4] {
        match self {
            Sentinel::Rwnd => Self::RWND,
            Sentinel::Endr => Self::ENDR,
            Sentinel::Eror => Self::EROR,
        }
    }
}

#[cfg(test)]
#[path = "sentinel_tests.rs"]
mod tests;
