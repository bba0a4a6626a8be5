//! Arbitrage value, profit and stake distribution calculations.
//!
//! Odds and ratios work in `f64` (see [`crate::orderbook::odds`]); stake
//! amounts are `Decimal`, scaled from the total by those ratios.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use time::OffsetDateTime;

use crate::market::{MarketRole, Outcome};

/// Margin below 1.0 an arbitrage value must clear to count as an opportunity.
pub const ARBITRAGE_EPSILON: f64 = 1e-9;

/// Smallest profit percentage ever reported, whatever the configured minimum.
pub const MIN_PROFIT_FLOOR_PERCENT: f64 = 0.01;

/// Sum of implied probabilities, `Σ 1/odds`.
pub fn arbitrage_value(odds: &[f64]) -> f64 {
    odds.iter().map(|o| 1.0 / o).sum()
}

/// Profit percentage locked in by an arbitrage value: `((1/value) - 1) * 100`.
pub fn profit_percent(arbitrage_value: f64) -> f64 {
    ((1.0 / arbitrage_value) - 1.0) * 100.0
}

/// Whether an arbitrage value is a reportable opportunity.
pub fn qualifies(arbitrage_value: f64, min_profit_percent: f64) -> bool {
    arbitrage_value.is_finite()
        && arbitrage_value > 0.0
        && arbitrage_value < 1.0 - ARBITRAGE_EPSILON
        && profit_percent(arbitrage_value) >= min_profit_percent.max(MIN_PROFIT_FLOOR_PERCENT)
}

/// Stakes per leg that return the same amount whichever leg wins.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StakeDistribution {
    /// Total staked across legs.
    pub total_stake: Decimal,
    /// Stake per leg, in leg order.
    pub stakes: Vec<Decimal>,
    /// Payout whichever leg wins.
    pub guaranteed_return: Decimal,
    /// `guaranteed_return - total_stake`.
    pub guaranteed_profit: Decimal,
}

/// Scale a display amount by an `f64` ratio. Unrepresentable results are zero.
fn scale(amount: Decimal, ratio: f64) -> Decimal {
    Decimal::from_f64(ratio)
        .and_then(|r| amount.checked_mul(r))
        .unwrap_or(Decimal::ZERO)
}

/// Split `total_stake` across legs proportionally to their implied probability.
///
/// `stake_i = T * (1 / (odds_i * arbitrage_value))`. The leg weights sum to 1,
/// so the stakes sum to `T` up to the precision of the `f64` weights.
pub fn stake_distribution(
    odds: &[f64],
    arbitrage_value: f64,
    total_stake: Decimal,
) -> StakeDistribution {
    let stakes = odds
        .iter()
        .map(|o| scale(total_stake, 1.0 / (o * arbitrage_value)))
        .collect();
    let guaranteed_return = scale(total_stake, 1.0 / arbitrage_value);

    StakeDistribution {
        total_stake,
        stakes,
        guaranteed_return,
        guaranteed_profit: guaranteed_return - total_stake,
    }
}

/// One leg of a detected opportunity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpportunityLeg {
    /// Role of the market in the event.
    pub role: MarketRole,
    /// Outcome backed.
    pub outcome: Outcome,
    /// Market hash.
    pub market_id: String,
    /// Label of the backed outcome.
    pub outcome_label: String,
    /// Order providing the price.
    pub order_id: String,
    /// Decimal odds.
    pub decimal_odds: f64,
    /// Taker-fillable size at this price, minor units.
    pub fillable: u128,
}

/// Detected arbitrage opportunity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArbitrageOpportunity {
    /// Event the legs belong to.
    pub event_id: String,
    /// "Team One vs Team Two".
    pub event_title: String,
    /// League label.
    pub league_label: Option<String>,
    /// Combination name, e.g. "YES + YES + YES".
    pub combination: String,
    /// Legs in combination order.
    pub legs: Vec<OpportunityLeg>,
    /// `Σ 1/odds`.
    pub arbitrage_value: f64,
    /// Profit margin in percent.
    pub profit_percent: f64,
    /// Stakes for the configured target total.
    pub stakes: StakeDistribution,
    /// Timestamp when opportunity was detected.
    #[serde(with = "time::serde::rfc3339")]
    pub detected_at: OffsetDateTime,
}

impl ArbitrageOpportunity {
    /// Largest total stake (minor units) the best orders can absorb.
    ///
    /// Leg `i` takes `T / (odds_i * value)` of the total, so its fillable size
    /// caps the total at `fillable_i * odds_i * value`.
    pub fn max_total_stake(&self) -> u128 {
        self.legs
            .iter()
            .map(|l| (l.fillable as f64 * l.decimal_odds * self.arbitrage_value).floor() as u128)
            .min()
            .unwrap_or(0)
    }
}
