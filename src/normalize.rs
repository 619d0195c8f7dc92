// src/normalize.rs
//! Money and quantity normalization into plain integers.
//!
//! Unit detection is plain substring matching on the lowercased text, checked in
//! the order billion → million → thousand. The short forms ("bn", "m", "k") are
//! not anchored to word boundaries, so any text containing an `m` is read as
//! millions ("200 items" → 200_000_000). Downstream consumers rely on these
//! exact semantics; tests pin them.
//!
//! Any Unicode decimal digit counts as a digit ("५०० crore" → 500), matching
//! what the cleaner's `\d` keeps. Text is folded to ASCII digits before parsing.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::deal::DealValue;

static RE_DECIMAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+(\.[0-9]+)?").expect("decimal regex"));
static RE_INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").expect("integer regex"));
static RE_DIGIT_CHAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d$").expect("digit char regex"));

const BILLION: f64 = 1_000_000_000.0;
const MILLION: f64 = 1_000_000.0;
const THOUSAND: f64 = 1_000.0;

/// Convert a raw deal value into an integer amount.
///
/// - `"€140 million"` → `140_000_000`
/// - `"$2.5bn"` → `2_500_000_000`
/// - `Amount(165e6)` → `165_000_000`
///
/// The currency never changes the magnitude, so it is not an input here.
pub fn normalize_deal_value(raw: Option<&DealValue>) -> Option<u64> {
    match raw? {
        DealValue::Amount(n) => amount_to_u64(*n),
        DealValue::Text(s) => normalize_money_text(s),
    }
}

fn amount_to_u64(n: f64) -> Option<u64> {
    // Truncation toward zero; negatives would break the non-negative invariant.
    if !n.is_finite() || n < 0.0 {
        return None;
    }
    Some(n.trunc() as u64)
}

/// Unicode decimal digit (general category `Nd`), e.g. `'7'`, `'७'`, `'٣'`.
pub(crate) fn is_decimal_digit(c: char) -> bool {
    if c.is_ascii() {
        return c.is_ascii_digit();
    }
    let mut buf = [0u8; 4];
    RE_DIGIT_CHAR.is_match(c.encode_utf8(&mut buf))
}

/// Numeric value of a decimal digit. `Nd` characters are encoded in contiguous
/// runs of ten ascending from zero, so the value is the offset into the run.
fn digit_value(c: char) -> Option<u32> {
    if c.is_ascii_digit() {
        return c.to_digit(10);
    }
    if !is_decimal_digit(c) {
        return None;
    }
    let mut start = c as u32;
    while let Some(prev) = start.checked_sub(1).and_then(char::from_u32) {
        if !is_decimal_digit(prev) {
            break;
        }
        start -= 1;
    }
    Some((c as u32 - start) % 10)
}

/// Replace every non-ASCII decimal digit with its ASCII counterpart.
fn fold_digits(s: &str) -> String {
    s.chars()
        .map(|c| match digit_value(c) {
            Some(d) if !c.is_ascii() => char::from(b'0' + d as u8),
            _ => c,
        })
        .collect()
}

fn normalize_money_text(raw: &str) -> Option<u64> {
    if raw.is_empty() {
        return None;
    }

    let text: String = fold_digits(&raw.to_lowercase())
        .chars()
        .filter(|c| !matches!(c, ',' | '€' | '$' | '£' | '₹'))
        .collect();

    let scales: [(&[&str], f64); 3] = [
        (&["billion", "bn"], BILLION),
        (&["million", "m"], MILLION),
        (&["thousand", "k"], THOUSAND),
    ];

    for (markers, scale) in scales {
        if markers.iter().any(|m| text.contains(m)) {
            if let Some(n) = first_decimal(&text) {
                return amount_to_u64(n * scale);
            }
        }
    }

    RE_INTEGER
        .find(&text)
        .and_then(|m| m.as_str().parse::<u64>().ok())
}

fn first_decimal(text: &str) -> Option<f64> {
    RE_DECIMAL
        .find(text)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Convert a textual quantity into an integer: `"700+"` → 700,
/// `"about 1,000 systems"` → 1000, `"none"` → `None`.
pub fn normalize_quantity(raw: Option<&str>) -> Option<u64> {
    let raw = raw?;
    let without_commas = fold_digits(raw).replace(',', "");
    RE_INTEGER
        .find(&without_commas)
        .and_then(|m| m.as_str().parse::<u64>().ok())
}
