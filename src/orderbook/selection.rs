//! Best-order selection over a market's resting orders.

use std::cmp::Ordering;

use time::OffsetDateTime;
use tracing::{instrument, trace};

use super::odds::{normalize_order, percent_filled};
use super::types::{BestOdds, LadderEntry, NormalizedOrder, Order, Quote, TakerLadder};
use crate::error::{Anomaly, AnomalyKind};
use crate::market::Outcome;

/// Result of a best-odds computation for one market.
#[derive(Debug, Clone)]
pub struct Selection {
    /// Best quote per outcome.
    pub best: BestOdds,
    /// Orders excluded because they were malformed.
    pub anomalies: Vec<Anomaly>,
}

/// Validate one order against the market it was listed under.
fn validate(market_id: &str, order: &Order) -> Result<NormalizedOrder, Anomaly> {
    let result = if order.market_id != market_id {
        Err(AnomalyKind::ForeignMarket(order.market_id.clone()))
    } else {
        normalize_order(order)
    };

    result.map_err(|kind| Anomaly {
        market_id: market_id.to_string(),
        order_id: order.order_id.clone(),
        kind,
    })
}

/// Validate every order of a market, collecting anomalies for rejects.
fn normalize_all(market_id: &str, orders: &[Order]) -> (Vec<NormalizedOrder>, Vec<Anomaly>) {
    let mut valid = Vec::with_capacity(orders.len());
    let mut anomalies = Vec::new();

    for order in orders {
        match validate(market_id, order) {
            Ok(normalized) => valid.push(normalized),
            Err(anomaly) => anomalies.push(anomaly),
        }
    }

    (valid, anomalies)
}

/// Select the best taker odds per outcome.
///
/// Orders whose remaining taker-fillable size is below `min_order_size`
/// (minor units, inclusive bound) are ignored whatever their price, and an
/// order with nothing left to fill is never selected, even with a zero
/// minimum. On equal
/// odds the first order in input order wins.
#[instrument(skip(orders), fields(orders = orders.len()))]
pub fn select_best_odds(market_id: &str, orders: &[Order], min_order_size: u128) -> Selection {
    let (valid, anomalies) = normalize_all(market_id, orders);

    let mut outcome_one: Option<Quote> = None;
    let mut outcome_two: Option<Quote> = None;

    for order in valid {
        if order.taker_fillable == 0 || order.taker_fillable < min_order_size {
            trace!(
                order_id = %order.order_id,
                fillable = %order.taker_fillable,
                "Order below minimum size"
            );
            continue;
        }

        let slot = match order.taker_outcome {
            Outcome::One => &mut outcome_one,
            Outcome::Two => &mut outcome_two,
        };

        let better = match slot {
            Some(current) => order.decimal_odds > current.decimal_odds,
            None => true,
        };

        if better {
            *slot = Some(Quote {
                order_id: order.order_id,
                decimal_odds: order.decimal_odds,
                fillable: order.taker_fillable,
            });
        }
    }

    Selection {
        best: BestOdds {
            market_id: market_id.to_string(),
            outcome_one,
            outcome_two,
            updated_at: OffsetDateTime::now_utc(),
        },
        anomalies,
    }
}

/// Organise all valid orders by the outcome a taker receives, best odds first.
///
/// Unlike [`select_best_odds`] no minimum size is applied, so exhausted orders
/// still show up with zero fillable size.
pub fn taker_ladder(market_id: &str, orders: &[Order]) -> (TakerLadder, Vec<Anomaly>) {
    let mut ladder = TakerLadder {
        market_id: market_id.to_string(),
        ..Default::default()
    };
    let mut anomalies = Vec::new();

    for order in orders {
        let normalized = match validate(market_id, order) {
            Ok(n) => n,
            Err(anomaly) => {
                anomalies.push(anomaly);
                continue;
            }
        };

        let entry = LadderEntry {
            order_id: normalized.order_id,
            decimal_odds: normalized.decimal_odds,
            implied_probability: normalized.implied_probability,
            taker_fillable: normalized.taker_fillable,
            maker_remaining: normalized.maker_remaining,
            percent_filled: percent_filled(order),
        };

        match normalized.taker_outcome {
            Outcome::One => ladder.outcome_one.push(entry),
            Outcome::Two => ladder.outcome_two.push(entry),
        }
    }

    // stable sort keeps input order among equal prices
    let by_odds_desc = |a: &LadderEntry, b: &LadderEntry| {
        b.decimal_odds
            .partial_cmp(&a.decimal_odds)
            .unwrap_or(Ordering::Equal)
    };
    ladder.outcome_one.sort_by(by_odds_desc);
    ladder.outcome_two.sort_by(by_odds_desc);

    (ladder, anomalies)
}
