// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;

use nix::sys::signal::Signal;

/// How the extractor's exit status classifies. Decoded
/// straight from [`std::process::ExitStatus`] via
/// [`ExitStatusExt::signal`]/[`ExitStatusExt::code`] — on Unix these
/// already distinguish `WIFSIGNALED` from a >=128 shell-propagated exit
/// code, so no separate `nix::sys::wait` call is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitClassification {
    Success,
    ExitedWithCode(i32),
    KilledBySignal(i32),
}

pub fn classify_exit(status: ExitStatus) -> ExitClassification {
    if let Some(signal) = status.signal() {
        return ExitClassification::KilledBySignal(signal);
    }
    match status.code().unwrap_or(-1) {
        0 => ExitClassification::Success,
        code if code >= 128 => ExitClassification::KilledBySignal(code - 128),
        code => ExitClassification::ExitedWithCode(code),
    }
}

/// The retry hints a signal-terminated extraction carries:
/// `SIGHUP`/`SIGTERM`/`SIGQUIT` never set `retry_same_host` but may
/// set `retry_next_host`; `SIGKILL` (the cancellation signal) clears both
/// so a killed job is never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryHints {
    pub retry_same_host: Option<bool>,
    pub retry_next_host: Option<bool>,
}

impl ExitClassification {
    pub fn retry_hints(self) -> RetryHints {
        match self {
            ExitClassification::Success | ExitClassification::ExitedWithCode(_) => RetryHints::default(),
            ExitClassification::KilledBySignal(signal) => {
                let retryable_next_host = matches!(
                    signal_of(signal),
                    Some(Signal::SIGHUP) | Some(Signal::SIGTERM) | Some(Signal::SIGQUIT)
                );
                RetryHints {
                    retry_same_host: Some(false),
                    retry_next_host: Some(retryable_next_host),
                }
            }
        }
    }
}

fn signal_of(raw: i32) -> Option<Signal> {
    Signal::try_from(raw).ok()
}

#[cfg(test)]
#[path = "exit_tests.rs"]
mod tests;
