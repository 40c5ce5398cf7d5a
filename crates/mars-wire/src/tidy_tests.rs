// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn bare_identifier_passes_through() {
    assert_eq!(tidy_scalar("ea"), "ea");
    assert_eq!(tidy_scalar("2024-09-08"), "2024-09-08");
}

#[test]
fn bare_number_passes_through() {
    assert_eq!(tidy_scalar("140212"), "140212");
    assert_eq!(tidy_scalar("-12.5"), "-12.5");
}

#[test]
fn quoted_values_pass_through_untouched() {
    assert_eq!(tidy_scalar("'already quoted'"), "'already quoted'");
    assert_eq!(tidy_scalar("\"already quoted\""), "\"already quoted\"");
}

#[test]
fn slash_separated_value_becomes_joined_list() {
    assert_eq!(tidy_scalar("00/06/12/18"), "00/06/12/18");
}

#[test]
fn leading_slash_is_not_treated_as_a_list() {
    // starts_with('/') => skip the list branch, falls through to ident/numb/quote.
    let out = tidy_scalar("/absolute/path");
    assert_eq!(out, "\"/absolute/path\"");
}

#[test]
fn value_needing_quotes_gets_double_quoted() {
    assert_eq!(tidy_scalar("has space!"), "\"has space!\"");
}

#[test]
fn value_containing_double_quote_gets_single_quoted() {
    assert_eq!(tidy_scalar("say \"hi\""), "'say \"hi\"'");
}

#[test]
fn list_value_joins_tidied_members() {
    let value = RequestValue::List(vec!["140212".into(), "140228".into()]);
    assert_eq!(tidy(&value), "140212/140228");
}
