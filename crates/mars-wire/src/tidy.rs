// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::OnceLock;

use regex::Regex;

use mars_core::RequestValue;

/// `[_0-9A-Za-z]+[_.\-+A-Za-z0-9:\t ]*[_.\-+A-Za-z0-9]*`
fn ident() -> &'static Regex {
    static IDENT: OnceLock<Regex> = OnceLock::new();
    IDENT.get_or_init(|| {
        Regex::new(r"^[_0-9A-Za-z]+[_.\-+A-Za-z0-9:\t ]*[_.\-+A-Za-z0-9]*")
            .expect("static regex is valid")
    })
}

/// `[\-.]*[0-9]+[.0-9]*[Ee]*[\-+]*[0-9]*`
fn numb() -> &'static Regex {
    static NUMB: OnceLock<Regex> = OnceLock::new();
    NUMB.get_or_init(|| {
        Regex::new(r"^[\-.]*[0-9]+[.0-9]*[Ee]*[\-+]*[0-9]*").expect("static regex is valid")
    })
}

/// Encode a single scalar token the way the extractor's request-script
/// parser expects it: bare when it already looks like an identifier or a
/// number, quoted otherwise. A value already wrapped in matching quotes is
/// passed through untouched, and a bare value containing `/` (but not
/// starting with one) is treated as a `/`-joined list.
///
/// Ported to match `tidy()` field-for-field, including the use of a
/// start-anchored (not full-string) match for the identifier and number
/// patterns: a leading-dash or leading-dot token like `-3` or `.5` fails
/// the identifier pattern (which requires an alphanumeric first
/// character) and falls through to the number pattern instead, exactly as
/// the original behaves under `re.match`.
fn tidy_scalar(data: &str) -> String {
    let data = data.trim();

    if let Some(rest) = data.strip_prefix('\'') {
        assert!(rest.ends_with('\''), "unbalanced single-quoted value: {data}");
        return data.to_string();
    }

    if let Some(rest) = data.strip_prefix('"') {
        assert!(rest.ends_with('"'), "unbalanced double-quoted value: {data}");
        return data.to_string();
    }

    if data.contains('/') && !data.starts_with('/') {
        let parts: Vec<String> = data.split('/').map(tidy_scalar).collect();
        return parts.join("/");
    }

    if ident().is_match(data) {
        return data.to_string();
    }

    if numb().is_match(data) {
        return data.to_string();
    }

    if data.contains('"') {
        assert!(!data.contains('\''), "value contains both quote styles: {data}");
        return format!("'{data}'");
    }

    format!("\"{data}\"")
}

/// Encode a [`RequestValue`] as a request-script token: a scalar encodes
/// to a single tidied token, a list encodes to its members tidied and
/// joined with `/` (the same representation `tidy_scalar` uses for a bare
/// `/`-separated string).
pub fn tidy(value: &RequestValue) -> String {
    match value {
        RequestValue::Scalar(s) => tidy_scalar(s),
        RequestValue::List(items) => items.iter().map(|s| tidy_scalar(s)).collect::<Vec<_>>().join("/"),
    }
}

#[cfg(test)]
#[path = "tidy_tests.rs"]
mod tests;
