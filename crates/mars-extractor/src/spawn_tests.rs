// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn augmented_env_namespaces_and_defaults_request_id() {
    let mut environ = HashMap::new();
    environ.insert("user_id".to_string(), "42".to_string());

    let vars = augmented_env(&environ, "fallback-uid");
    assert!(vars.contains(&("MARS_ENVIRON_USER_ID".to_string(), "42".to_string())));
    assert!(vars.contains(&("MARS_ENVIRON_REQUEST_ID".to_string(), "fallback-uid".to_string())));
}

#[test]
fn augmented_env_honors_a_caller_supplied_request_id() {
    let mut environ = HashMap::new();
    environ.insert("request_id".to_string(), "caller-uid".to_string());

    let vars = augmented_env(&environ, "fallback-uid");
    let request_id_entries: Vec<_> = vars.iter().filter(|(k, _)| k == "MARS_ENVIRON_REQUEST_ID").collect();
    assert_eq!(request_id_entries, vec![&("MARS_ENVIRON_REQUEST_ID".to_string(), "caller-uid".to_string())]);
}
