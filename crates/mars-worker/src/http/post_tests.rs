// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn success_classification_is_none() {
    assert!(classify(ExitClassification::Success).is_none());
}

#[test]
fn nonzero_exit_is_400_with_exit_code_header() {
    let classified = classify(ExitClassification::ExitedWithCode(3)).unwrap();
    assert_eq!(classified.status, 400);
    assert_eq!(classified.exit_code_header, Some(3));
    assert_eq!(classified.body, json!({ "exited": 3 }));
}

#[test]
fn sigterm_is_500_with_next_host_retry_only() {
    let classified = classify(ExitClassification::KilledBySignal(nix::sys::signal::Signal::SIGTERM as i32)).unwrap();
    assert_eq!(classified.status, 500);
    assert_eq!(classified.retry_same_host, Some(false));
    assert_eq!(classified.retry_next_host, Some(true));
}

#[test]
fn sigkill_carries_no_retry_at_all() {
    let classified = classify(ExitClassification::KilledBySignal(nix::sys::signal::Signal::SIGKILL as i32)).unwrap();
    assert_eq!(classified.retry_same_host, Some(false));
    assert_eq!(classified.retry_next_host, Some(false));
}
