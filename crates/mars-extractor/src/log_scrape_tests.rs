// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn extracts_byte_count_from_a_matching_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("uid.log");
    std::fs::write(&path, "starting up\nTransfering 524288 bytes\nmore noise\n").unwrap();

    assert_eq!(scrape_expected_size(&path), Some(524288));
}

#[test]
fn returns_none_when_pattern_is_absent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("uid.log");
    std::fs::write(&path, "still working\n").unwrap();

    assert_eq!(scrape_expected_size(&path), None);
}

#[test]
fn returns_none_when_file_is_missing() {
    assert_eq!(scrape_expected_size(Path::new("/nonexistent/uid.log")), None);
}

#[tokio::test]
async fn wait_returns_as_soon_as_the_line_appears() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("uid.log").to_path_buf();
    std::fs::write(&path, "warming up\n").unwrap();

    let write_path = path.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        std::fs::write(&write_path, "Transfering 99 bytes\n").unwrap();
    });

    let size = wait_for_expected_size(&path, Duration::from_millis(5), Duration::from_secs(2)).await;
    assert_eq!(size, Some(99));
}

#[tokio::test]
async fn wait_times_out_when_the_line_never_appears() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("uid.log");
    std::fs::write(&path, "stuck\n").unwrap();

    let size = wait_for_expected_size(&path, Duration::from_millis(5), Duration::from_millis(30)).await;
    assert_eq!(size, None);
}
