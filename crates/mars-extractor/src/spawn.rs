// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use mars_core::Request;
use mars_wire::{write_request_script, TargetSpec};
use tokio::io::AsyncWriteExt;
use tokio::net::unix::pipe;
use tokio::process::{Child, Command};

use crate::error::ExtractorError;

/// A running pipe-mode extraction: `artifact` is the read end of the
/// anonymous byte stream the extractor writes its binary output to;
/// `child` must be read to EOF and then reaped by the caller.
pub struct PipeExtraction {
    pub child: Child,
    pub artifact: pipe::Receiver,
}

/// A running file-mode extraction. The artifact is observed indirectly,
/// via the size of the file named in the request's `target`.
pub struct FileExtraction {
    pub child: Child,
}

fn log_path(logdir: &Path, uid: &str) -> PathBuf {
    logdir.join(format!("{uid}.log"))
}

fn open_log_files(logdir: &Path, uid: &str) -> Result<(std::fs::File, std::fs::File), ExtractorError> {
    let path = log_path(logdir, uid);
    let stdout = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)
        .map_err(|source| ExtractorError::LogFile {
            path: path.display().to_string(),
            source,
        })?;
    let stderr = stdout.try_clone()?;
    Ok((stdout, stderr))
}

/// `MARS_ENVIRON_<KEY>` for every provided environ entry, plus a
/// `MARS_ENVIRON_REQUEST_ID` defaulting to `uid` when the caller didn't
/// already supply a `request_id` entry.
fn augmented_env(environ: &HashMap<String, String>, uid: &str) -> Vec<(String, String)> {
    let mut vars: Vec<(String, String)> = environ
        .iter()
        .map(|(k, v)| (format!("MARS_ENVIRON_{}", k.to_uppercase()), v.clone()))
        .collect();
    if !vars.iter().any(|(k, _)| k == "MARS_ENVIRON_REQUEST_ID") {
        vars.push(("MARS_ENVIRON_REQUEST_ID".to_string(), uid.to_string()));
    }
    vars
}

async fn write_script(child: &mut Child, script: Vec<u8>) -> Result<(), ExtractorError> {
    let mut stdin = child.stdin.take().ok_or_else(|| {
        ExtractorError::Spawn(std::io::Error::other("extractor child has no stdin handle"))
    })?;
    stdin.write_all(&script).await?;
    stdin.shutdown().await?;
    Ok(())
}

/// Spawn the extractor in pipe mode: its binary artifact is written to an
/// anonymous pipe the caller reads to EOF, rather than to a shared-
/// filesystem path.
///
/// The extra descriptor is created with [`tokio::net::unix::pipe::pipe`]
/// (non-blocking, `O_CLOEXEC` by default); a `pre_exec` hook clears its
/// close-on-exec flag in the forked child only, so the descriptor survives
/// the extractor's `exec` at its original number — the same trick the
/// original implementation gets for free from `os.set_inheritable`, ported
/// via `nix::fcntl` since Rust-owned descriptors default to close-on-exec.
pub async fn spawn_pipe(
    executable: &str,
    requests: &[Request],
    uid: &str,
    logdir: &Path,
    environ: &HashMap<String, String>,
) -> Result<PipeExtraction, ExtractorError> {
    let (stdout, stderr) = open_log_files(logdir, uid)?;
    let (tx, rx) = pipe::pipe().map_err(ExtractorError::Pipe)?;
    let artifact_fd = tx.as_raw_fd();

    let mut script = Vec::new();
    for request in requests {
        write_request_script(request, TargetSpec::Fd(artifact_fd), &mut script)?;
    }

    let mut command = Command::new(executable);
    command.stdin(Stdio::piped()).stdout(stdout).stderr(stderr);
    for (key, value) in augmented_env(environ, uid) {
        command.env(key, value);
    }

    // Safety: the closure only calls an async-signal-safe `fcntl` and
    // runs strictly between fork and exec in the child.
    unsafe {
        command.pre_exec(move || {
            nix::fcntl::fcntl(artifact_fd, nix::fcntl::FcntlArg::F_SETFD(nix::fcntl::FdFlag::empty()))
                .map_err(|errno| std::io::Error::from_raw_os_error(errno as i32))?;
            Ok(())
        });
    }

    let mut child = command.spawn().map_err(ExtractorError::Spawn)?;
    drop(tx);

    write_script(&mut child, script).await?;

    Ok(PipeExtraction { child, artifact: rx })
}

/// Spawn the extractor in file mode: the request script's `target` line
/// names a path on a shared filesystem (the cache entry's `target`)
/// rather than an inherited descriptor, and the artifact is observed by
/// polling that path's size.
pub async fn spawn_file(
    executable: &str,
    requests: &[Request],
    target_path: &str,
    uid: &str,
    logdir: &Path,
    environ: &HashMap<String, String>,
) -> Result<FileExtraction, ExtractorError> {
    let (stdout, stderr) = open_log_files(logdir, uid)?;

    let mut script = Vec::new();
    for request in requests {
        write_request_script(request, TargetSpec::Path(target_path), &mut script)?;
    }

    let mut command = Command::new(executable);
    command.stdin(Stdio::piped()).stdout(stdout).stderr(stderr);
    for (key, value) in augmented_env(environ, uid) {
        command.env(key, value);
    }

    let mut child = command.spawn().map_err(ExtractorError::Spawn)?;
    write_script(&mut child, script).await?;

    Ok(FileExtraction { child })
}

#[cfg(test)]
#[path = "spawn_tests.rs"]
mod tests;
