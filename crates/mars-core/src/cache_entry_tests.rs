// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn failed_entry_is_retryable_others_are_not() {
    let mut entry = CacheEntry::queued("node-a", "share-a", "/data/out.grib", 0);
    assert!(!entry.retryable());

    entry.mark_running();
    assert!(!entry.retryable());

    entry.mark_failed("extractor exited with signal 9");
    assert!(entry.retryable());

    entry.mark_completed(1024, None);
    assert!(!entry.retryable());
}

#[test]
fn status_serializes_uppercase() {
    let json = serde_json::to_string(&CacheStatus::Running).expect("serializes");
    assert_eq!(json, "\"RUNNING\"");
}
