// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

/// `^[a-f0-9-]{36}$`: a lowercase-hex-or-dash string of
/// exactly 36 characters. A real `uuid::Uuid::new_v4()` rendering always
/// satisfies this; it is also the shape checked before trusting a caller-
/// supplied `request_id` as a path component.
pub fn validate(uid: &str) -> bool {
    uid.len() == 36 && uid.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b) || b == b'-')
}

#[cfg(test)]
#[path = "uid_tests.rs"]
mod tests;
