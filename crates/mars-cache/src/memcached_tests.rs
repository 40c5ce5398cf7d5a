// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn endpoint_selection_is_stable_for_a_given_key() {
    let index = MemcachedIndex::new(vec![
        "10.0.0.1:11211".to_string(),
        "10.0.0.2:11211".to_string(),
        "10.0.0.3:11211".to_string(),
    ]);

    let first = index.endpoint_for("abc123").unwrap().to_string();
    let second = index.endpoint_for("abc123").unwrap().to_string();
    assert_eq!(first, second);
}

#[test]
fn no_endpoints_is_an_error() {
    let index = MemcachedIndex::new(vec![]);
    assert!(matches!(index.endpoint_for("abc123"), Err(CacheError::NoEndpoints)));
}
