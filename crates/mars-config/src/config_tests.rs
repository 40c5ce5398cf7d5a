// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn missing_file_falls_back_to_defaults() {
    let config = Config::load_from("/nonexistent/path/mars-server.yaml").unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn parses_shares_and_memcached() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mars.yaml");
    std::fs::write(
        &path,
        r#"
CLUSTER: cci2
CACHE_ROOT: /data
SHARES: [a, b]
MEMCACHED: ["10.0.0.1:11211", "10.0.0.2:11211"]
CACHE_FOLDER: grib-cache
DOWNLOAD_SERVERS: ["https://example.org"]
"#,
    )
    .unwrap();

    let config = Config::load_from(path.to_str().unwrap()).unwrap();
    assert_eq!(config.cluster, "cci2");
    assert_eq!(config.shares, vec!["a", "b"]);
    assert_eq!(config.memcached, vec!["10.0.0.1:11211", "10.0.0.2:11211"]);
    assert_eq!(config.cache_folder, "grib-cache");
}

#[test]
fn deprecated_mars_cache_folder_key_is_honored() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mars.yaml");
    std::fs::write(&path, "SHARES: [a]\nMARS_CACHE_FOLDER: legacy\n").unwrap();

    let config = Config::load_from(path.to_str().unwrap()).unwrap();
    assert_eq!(config.cache_folder, "legacy");
}

#[test]
fn cache_folder_takes_precedence_over_deprecated_alias() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mars.yaml");
    std::fs::write(&path, "SHARES: [a]\nCACHE_FOLDER: new\nMARS_CACHE_FOLDER: legacy\n").unwrap();

    let config = Config::load_from(path.to_str().unwrap()).unwrap();
    assert_eq!(config.cache_folder, "new");
}

#[test]
fn empty_shares_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mars.yaml");
    std::fs::write(&path, "SHARES: []\n").unwrap();

    let err = Config::load_from(path.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, ConfigError::NoShares));
}
