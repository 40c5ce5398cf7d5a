// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use nix::sys::utsname::uname;

/// The local node name, used to stamp cache entries with the worker host
/// that owns an extraction (mirrors `os.uname().nodename` in the original
/// implementation).
pub fn nodename() -> String {
    uname()
        .map(|info| info.nodename().to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string())
}
