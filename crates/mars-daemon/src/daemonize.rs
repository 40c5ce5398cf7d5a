// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use fs2::FileExt;
use nix::unistd::{fork, setsid, ForkResult};

/// Classic double-fork + `setsid()` detach. The first fork's parent
/// exits immediately so the shell
/// that launched `marsd` regains its prompt; the intermediate process
/// calls `setsid()` to drop its controlling terminal, then forks again so
/// the final daemon process can never reacquire one.
pub fn daemonize() -> Result<()> {
    // Safety: called once at startup before any other thread exists.
    match unsafe { fork() }.context("first fork failed")? {
        ForkResult::Parent { .. } => std::process::exit(0),
        ForkResult::Child => {}
    }

    setsid().context("setsid failed")?;

    // Safety: see above; still single-threaded at this point.
    match unsafe { fork() }.context("second fork failed")? {
        ForkResult::Parent { .. } => std::process::exit(0),
        ForkResult::Child => {}
    }

    Ok(())
}

/// Write the current PID to `path`, holding an exclusive lock on the
/// file for as long as the process runs.
pub fn write_pidfile(path: &Path) -> Result<()> {
    let file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .with_context(|| format!("failed to open pidfile {}", path.display()))?;

    file.try_lock_exclusive().with_context(|| format!("pidfile {} is already locked by a running daemon", path.display()))?;

    let mut file = file;
    file.set_len(0)?;
    write!(file, "{}", std::process::id())?;
    file.flush()?;

    // Intentionally leaked: the lock must outlive this function and be
    // held for the life of the process, released only on exit.
    std::mem::forget(file);
    Ok(())
}
