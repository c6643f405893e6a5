//! Price normalization
//!
//! Turns a loosely-typed upstream attribute bag into stable metrics:
//! - Prioritized field candidates per metric
//! - Number/numeric-string coercion
//! - Cross-rate derivation from two USD legs

mod cross_rate;

pub use cross_rate::{parse_pair_symbols, price_quote, resolve_cross_rate, ResolvedLegs};

use crate::types::{NormalizedPoolMetrics, RawPoolAttributes};
use serde_json::Value;

/// Where a metric may live in the attribute bag
#[derive(Debug, Clone, Copy)]
enum Field {
    Flat(&'static str),
    Nested(&'static str, &'static str),
}

const PRICE_FIELDS: &[Field] = &[
    Field::Flat("base_token_price_usd"),
    Field::Flat("price_usd"),
    Field::Flat("quote_token_price_usd"),
];

const CHANGE_FIELDS: &[Field] = &[
    Field::Flat("price_change_percentage_24h"),
    Field::Nested("price_change_percentage", "h24"),
    Field::Nested("price_change", "h24"),
    Field::Flat("price_change_24h"),
];

const VOLUME_FIELDS: &[Field] = &[
    Field::Nested("volume_usd", "h24"),
    Field::Flat("volume_usd_24h"),
];

const LIQUIDITY_FIELDS: &[Field] = &[
    Field::Flat("reserve_in_usd"),
    Field::Flat("liquidity_usd"),
];

/// Normalize one pool snapshot. Total: malformed input degrades to zeros.
pub fn normalize(raw: &RawPoolAttributes) -> NormalizedPoolMetrics {
    NormalizedPoolMetrics {
        price_usd: first_finite(raw, PRICE_FIELDS).unwrap_or(0.0),
        change_percent_24h: first_finite(raw, CHANGE_FIELDS).unwrap_or(0.0),
        volume_24h_usd: first_finite(raw, VOLUME_FIELDS).unwrap_or(0.0),
        liquidity_usd: first_finite(raw, LIQUIDITY_FIELDS).unwrap_or(0.0),
    }
}

fn first_finite(raw: &RawPoolAttributes, candidates: &[Field]) -> Option<f64> {
    candidates.iter().find_map(|field| {
        let value = match *field {
            Field::Flat(key) => raw.get(key),
            Field::Nested(outer, inner) => raw.get_nested(outer, inner),
        }?;
        coerce_number(value)
    })
}

/// Coerce a JSON value into a finite number.
///
/// Native numbers and numeric strings are accepted; strings are read
/// leniently (leading whitespace skipped, trailing garbage ignored).
/// Everything else, and any non-finite result, is `None`.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => parse_float_prefix(s)?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Parse the longest leading float literal of `s`
fn parse_float_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        end = frac_end;
    }

    if digits == 0 {
        return None;
    }

    // Exponent only counts when followed by at least one digit
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok()
}
