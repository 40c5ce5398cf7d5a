// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use futures_util::stream;

fn chunk(bytes: &[u8]) -> reqwest::Result<bytes::Bytes> {
    Ok(bytes::Bytes::copy_from_slice(bytes))
}

#[tokio::test]
async fn writes_plain_chunks_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.grib");
    let chunks = vec![chunk(b"hello "), chunk(b"world"), chunk(Sentinel::ENDR)];
    let body = stream::iter(chunks);

    run(body, &target, OpenMode::Write, 0).await.unwrap();
    assert_eq!(std::fs::read(&target).unwrap(), b"hello world");
}

#[tokio::test]
async fn rewind_discards_bytes_written_since_the_saved_position() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.grib");
    let chunks = vec![chunk(b"AAAA"), chunk(Sentinel::RWND), chunk(b"B"), chunk(Sentinel::ENDR)];
    let body = stream::iter(chunks);

    run(body, &target, OpenMode::Write, 0).await.unwrap();
    assert_eq!(std::fs::read(&target).unwrap(), b"B");
}

#[tokio::test]
async fn rewind_respects_a_nonzero_saved_position() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.grib");
    std::fs::write(&target, b"PREFIX").unwrap();

    let chunks = vec![chunk(b"garbage"), chunk(Sentinel::RWND), chunk(b"clean"), chunk(Sentinel::ENDR)];
    let body = stream::iter(chunks);

    run(body, &target, OpenMode::Append, 6).await.unwrap();
    assert_eq!(std::fs::read(&target).unwrap(), b"PREFIXclean");
}

#[tokio::test]
async fn missing_endr_is_an_incomplete_transfer_error() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.grib");
    let chunks = vec![chunk(b"partial")];
    let body = stream::iter(chunks);

    let err = run(body, &target, OpenMode::Write, 0).await.unwrap_err();
    assert!(matches!(err, ClientError::Protocol(_)));
}

#[tokio::test]
async fn eror_sentinel_surfaces_the_following_json_as_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.grib");
    let chunks = vec![chunk(Sentinel::EROR), chunk(br#"{"message": "disk full"}"#)];
    let body = stream::iter(chunks);

    let err = run(body, &target, OpenMode::Write, 0).await.unwrap_err();
    assert!(matches!(err, ClientError::Extractor { message, .. } if message == "disk full"));
}

#[tokio::test]
async fn unrecognized_four_byte_chunk_is_a_protocol_error() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.grib");
    let chunks = vec![chunk(b"abcd"), chunk(Sentinel::ENDR)];
    let body = stream::iter(chunks);

    let err = run(body, &target, OpenMode::Write, 0).await.unwrap_err();
    assert!(matches!(err, ClientError::Protocol(_)));
}

#[tokio::test]
async fn append_mode_starts_past_existing_content() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.grib");
    std::fs::write(&target, b"existing-").unwrap();

    let chunks = vec![chunk(b"more"), chunk(Sentinel::ENDR)];
    let body = stream::iter(chunks);

    run(body, &target, OpenMode::Append, 9).await.unwrap();
    assert_eq!(std::fs::read(&target).unwrap(), b"existing-more");
}
