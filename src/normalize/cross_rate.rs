//! Cross-rate derivation from two USD legs
//!
//! The pair name decides which leg is the subject. When the target symbol is on
//! neither side the first finite leg (base before quote) becomes the subject and
//! the other leg the counter, which can mislabel the two for unexpected pairs.

use super::coerce_number;
use crate::error::{Result, WidgetError};
use crate::types::{CrossRatePrice, RawPoolAttributes};

/// Legs after role assignment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedLegs {
    pub subject_usd: f64,
    pub counter_usd: f64,
}

/// Split a pair name into normalized `(left, right)` symbols.
///
/// `" $coin / wron "` becomes `("COIN", "WRON")`. Missing sides are empty.
pub fn parse_pair_symbols(pair_name: &str) -> (String, String) {
    let mut sides = pair_name.split('/').map(normalize_symbol);
    let left = sides.next().unwrap_or_default();
    let right = sides.next().unwrap_or_default();
    (left, right)
}

fn normalize_symbol(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed.strip_prefix('$').unwrap_or(trimmed).to_uppercase()
}

/// Decide which USD leg prices the target token
pub fn resolve_cross_rate(
    pair_name: &str,
    base_usd: f64,
    quote_usd: f64,
    target_symbol: &str,
) -> Result<ResolvedLegs> {
    let target = normalize_symbol(target_symbol);
    let (left, right) = parse_pair_symbols(pair_name);

    let (subject, counter) = if !target.is_empty() && left == target {
        (Some(base_usd), Some(quote_usd))
    } else if !target.is_empty() && right == target {
        (Some(quote_usd), Some(base_usd))
    } else if base_usd.is_finite() {
        (Some(base_usd), Some(quote_usd))
    } else if quote_usd.is_finite() {
        (Some(quote_usd), Some(base_usd))
    } else {
        (None, None)
    };

    match (subject, counter) {
        (Some(subject_usd), Some(counter_usd))
            if subject_usd.is_finite() && counter_usd.is_finite() =>
        {
            Ok(ResolvedLegs {
                subject_usd,
                counter_usd,
            })
        }
        _ => Err(WidgetError::InvalidPrices),
    }
}

impl CrossRatePrice {
    /// Resolve roles and compute `subject / counter`
    pub fn derive(
        pair_name: &str,
        base_usd: f64,
        quote_usd: f64,
        target_symbol: &str,
    ) -> Result<Self> {
        let legs = resolve_cross_rate(pair_name, base_usd, quote_usd, target_symbol)?;
        let cross_rate = legs.subject_usd / legs.counter_usd;
        if !cross_rate.is_finite() {
            return Err(WidgetError::InvalidPrices);
        }

        Ok(Self {
            base_usd,
            quote_usd,
            subject_usd: legs.subject_usd,
            counter_usd: legs.counter_usd,
            cross_rate,
        })
    }
}

/// Build the cross-rate price straight from an upstream attribute bag
pub fn price_quote(raw: &RawPoolAttributes, target_symbol: &str) -> Result<CrossRatePrice> {
    let leg = |key: &str| raw.get(key).and_then(coerce_number).unwrap_or(f64::NAN);
    CrossRatePrice::derive(
        raw.name(),
        leg("base_token_price_usd"),
        leg("quote_token_price_usd"),
        target_symbol,
    )
}
