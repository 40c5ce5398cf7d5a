// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::io::{self, Write};

use mars_core::Request;
use thiserror::Error;

use crate::tidy::tidy;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("request has no keys other than target")]
    Empty,
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// How the extractor's request script should name its output target.
///
/// Pipe mode never has a real path: the artifact is written through an
/// inheritable fd that the extractor process substitutes by number.
/// File mode writes a path on a shared filesystem, tidied like any other
/// scalar value.
pub enum TargetSpec<'a> {
    /// Pipe mode: `TARGET='&<fd>'`, matching the uppercase key and literal
    /// `&N` fd-substitution syntax MARS's request language uses for an
    /// inherited file descriptor.
    Fd(i32),
    /// File mode: `target=<tidied path>`, lowercase key, ordinary value.
    Path(&'a str),
}

/// Write one `RETRIEVE` block per request key, followed by the target
/// line, to `out`. This is the single encoder every caller — the HTTP
/// engine's pipe mode, its file mode, and the WebSocket engine's script
/// writer — goes through, so the bytes an extractor receives are
/// identical regardless of which transport accepted the request.
pub fn write_request_script(
    request: &Request,
    target: TargetSpec<'_>,
    mut out: impl Write,
) -> Result<(), WireError> {
    out.write_all(b"RETRIEVE,\n")?;

    let mut wrote_any = false;
    for (key, value) in request.iter() {
        if key == "target" {
            continue;
        }
        wrote_any = true;
        writeln!(out, "{key}={},", tidy(value))?;
    }

    if !wrote_any {
        return Err(WireError::Empty);
    }

    match target {
        TargetSpec::Fd(fd) => writeln!(out, "TARGET='&{fd}'")?,
        TargetSpec::Path(path) => writeln!(out, "target={}", tidy(&mars_core::RequestValue::Scalar(path.to_string())))?,
    }

    Ok(())
}

#[cfg(test)]
#[path = "script_tests.rs"]
mod tests;
