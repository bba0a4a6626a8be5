//! Odds normalization and taker size calculations.
//!
//! Decimal odds are computed in `f64`. This deliberately forgoes arbitrary
//! precision: the numerator is normalized into (0, 1) before division, which
//! keeps 15-17 significant digits and is enough for price comparison, but the
//! resulting odds must not be used for exact settlement. Currency amounts never
//! go through floating point; they use checked `u128` arithmetic.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::types::{NormalizedOrder, Order, ODDS_DENOMINATOR};
use crate::error::{AnomalyKind, ConfigError};

/// Maker implied probability in (0, 1) for a fixed-point numerator.
pub fn implied_probability(numerator: u128) -> f64 {
    numerator as f64 / ODDS_DENOMINATOR as f64
}

/// Taker decimal odds, `1 / implied_probability`.
pub fn decimal_odds(numerator: u128) -> f64 {
    ODDS_DENOMINATOR as f64 / numerator as f64
}

/// Stake a taker can place against `maker_remaining` at the given odds.
///
/// `maker_remaining * 1e20 / numerator - maker_remaining`, floor division.
/// `numerator` must be in (0, 1e20).
pub fn remaining_taker_size(maker_remaining: u128, numerator: u128) -> Result<u128, AnomalyKind> {
    let scaled = maker_remaining
        .checked_mul(ODDS_DENOMINATOR)
        .ok_or(AnomalyKind::Overflow(maker_remaining))?;
    // numerator < denominator, so the quotient is never below maker_remaining
    Ok(scaled / numerator - maker_remaining)
}

/// Validate an order and compute its taker odds and fillable size.
pub fn normalize_order(order: &Order) -> Result<NormalizedOrder, AnomalyKind> {
    let numerator = order
        .implied_probability
        .ok_or(AnomalyKind::MissingProbability)?;
    if numerator <= 0 {
        return Err(AnomalyKind::NonPositiveProbability(numerator));
    }
    if numerator as u128 >= ODDS_DENOMINATOR {
        return Err(AnomalyKind::ProbabilityOutOfRange(numerator));
    }
    if order.total_size < 0 {
        return Err(AnomalyKind::NegativeSize {
            field: "total size",
            value: order.total_size,
        });
    }
    if order.filled_size < 0 {
        return Err(AnomalyKind::NegativeSize {
            field: "filled size",
            value: order.filled_size,
        });
    }
    if order.filled_size > order.total_size {
        return Err(AnomalyKind::OverFilled {
            filled: order.filled_size,
            total: order.total_size,
        });
    }

    let numerator = numerator as u128;
    let odds = decimal_odds(numerator);
    // Numerators within f64 spacing of the denominator round to odds of exactly 1.
    if odds <= 1.0 {
        return Err(AnomalyKind::ProbabilityOutOfRange(numerator as i128));
    }

    let maker_remaining = (order.total_size - order.filled_size) as u128;
    let taker_fillable = remaining_taker_size(maker_remaining, numerator)?;

    Ok(NormalizedOrder {
        order_id: order.order_id.clone(),
        taker_outcome: order.taker_outcome(),
        implied_probability: implied_probability(numerator),
        decimal_odds: odds,
        maker_remaining,
        taker_fillable,
    })
}

/// Percentage of an order's stake already filled.
pub fn percent_filled(order: &Order) -> f64 {
    if order.total_size <= 0 {
        0.0
    } else {
        order.filled_size as f64 / order.total_size as f64 * 100.0
    }
}

/// Convert minor units to display units (e.g. 1_500_000 -> 1.5 USDC).
///
/// Returns `None` when the amount does not fit a `Decimal`.
pub fn to_display_units(minor: u128, decimals: u32) -> Option<Decimal> {
    let minor = i128::try_from(minor).ok()?;
    Decimal::try_from_i128_with_scale(minor, decimals).ok()
}

/// Convert display units to minor units, truncating sub-unit digits.
pub fn to_minor_units(
    name: &'static str,
    amount: Decimal,
    decimals: u32,
) -> Result<u128, ConfigError> {
    if amount.is_sign_negative() {
        return Err(ConfigError::NegativeThreshold { name, value: amount });
    }
    let scale = Decimal::from(10u64.checked_pow(decimals).ok_or(ConfigError::OutOfRange {
        name,
        value: amount,
    })?);
    amount
        .checked_mul(scale)
        .and_then(|v| v.trunc().to_u128())
        .ok_or(ConfigError::OutOfRange { name, value: amount })
}

/// Probability numerator for decimal odds (used by tests and fixtures).
pub fn numerator_for_odds(odds: f64) -> u128 {
    (ODDS_DENOMINATOR as f64 / odds).round() as u128
}
