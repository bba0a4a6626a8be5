//! Order and best-odds types.

use serde::Serialize;
use time::OffsetDateTime;

use crate::market::Outcome;

/// Fixed-point denominator of the protocol's implied probability (1e20).
pub const ODDS_DENOMINATOR: u128 = 100_000_000_000_000_000_000;

/// One resting maker order, as delivered by an order source.
///
/// Sizes are signed so that malformed payloads can be represented and
/// reported instead of silently wrapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Order hash.
    pub order_id: String,
    /// Market hash.
    pub market_id: String,
    /// Whether the maker backs outcome one.
    pub maker_is_betting_outcome_one: bool,
    /// Maker's implied probability numerator over [`ODDS_DENOMINATOR`].
    pub implied_probability: Option<i128>,
    /// Maker stake in minor units.
    pub total_size: i128,
    /// Portion of the maker stake already filled, in minor units.
    pub filled_size: i128,
}

impl Order {
    /// Outcome a taker receives by filling this order.
    pub fn taker_outcome(&self) -> Outcome {
        Outcome::taker_side(self.maker_is_betting_outcome_one)
    }
}

/// Order after validation and normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedOrder {
    /// Order hash.
    pub order_id: String,
    /// Outcome the taker receives.
    pub taker_outcome: Outcome,
    /// Maker's implied probability in (0, 1).
    pub implied_probability: f64,
    /// Taker decimal odds, always greater than 1.
    pub decimal_odds: f64,
    /// Unfilled maker stake, minor units.
    pub maker_remaining: u128,
    /// Stake a taker can still place against this order, minor units.
    pub taker_fillable: u128,
}

/// Best price available to a taker for one outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    /// Order providing the price.
    pub order_id: String,
    /// Decimal odds.
    pub decimal_odds: f64,
    /// Remaining taker-fillable size backing the price, minor units.
    pub fillable: u128,
}

/// Best taker odds for both outcomes of one market.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestOdds {
    /// Market hash.
    pub market_id: String,
    /// Best quote for a taker backing outcome one.
    pub outcome_one: Option<Quote>,
    /// Best quote for a taker backing outcome two.
    pub outcome_two: Option<Quote>,
    /// When the snapshot was computed.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl BestOdds {
    /// Snapshot with no qualifying order on either side.
    pub fn empty(market_id: impl Into<String>) -> Self {
        Self {
            market_id: market_id.into(),
            outcome_one: None,
            outcome_two: None,
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    /// Best quote for an outcome.
    pub fn quote(&self, outcome: Outcome) -> Option<&Quote> {
        match outcome {
            Outcome::One => self.outcome_one.as_ref(),
            Outcome::Two => self.outcome_two.as_ref(),
        }
    }

    /// Best decimal odds for an outcome.
    pub fn price(&self, outcome: Outcome) -> Option<f64> {
        self.quote(outcome).map(|q| q.decimal_odds)
    }

    /// Whether both sides carry the same price and size as `other`.
    ///
    /// Order ids and timestamps are ignored: a different order offering the
    /// identical price and size is not a change.
    pub fn same_prices_as(&self, other: &BestOdds) -> bool {
        fn key(q: Option<&Quote>) -> Option<(f64, u128)> {
            q.map(|q| (q.decimal_odds, q.fillable))
        }
        key(self.outcome_one.as_ref()) == key(other.outcome_one.as_ref())
            && key(self.outcome_two.as_ref()) == key(other.outcome_two.as_ref())
    }

    /// Whether neither side has a price.
    pub fn is_empty(&self) -> bool {
        self.outcome_one.is_none() && self.outcome_two.is_none()
    }
}

/// One row of a taker ladder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LadderEntry {
    /// Order hash.
    pub order_id: String,
    /// Decimal odds for the taker.
    pub decimal_odds: f64,
    /// Maker's implied probability.
    pub implied_probability: f64,
    /// Remaining taker-fillable size, minor units.
    pub taker_fillable: u128,
    /// Unfilled maker stake, minor units.
    pub maker_remaining: u128,
    /// Percentage of the maker stake already filled.
    pub percent_filled: f64,
}

/// All valid orders of a market organised by what the taker receives,
/// best odds first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TakerLadder {
    /// Market hash.
    pub market_id: String,
    /// Orders a taker fills to back outcome one.
    pub outcome_one: Vec<LadderEntry>,
    /// Orders a taker fills to back outcome two.
    pub outcome_two: Vec<LadderEntry>,
}

impl TakerLadder {
    /// Ladder rows for an outcome.
    pub fn side(&self, outcome: Outcome) -> &[LadderEntry] {
        match outcome {
            Outcome::One => &self.outcome_one,
            Outcome::Two => &self.outcome_two,
        }
    }

    /// Total taker-fillable size on one side.
    pub fn total_fillable(&self, outcome: Outcome) -> u128 {
        self.side(outcome).iter().map(|e| e.taker_fillable).sum()
    }
}
