//! Arbitrage detection across the markets of one event.

use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, info, instrument};

use super::calculator::{
    arbitrage_value, profit_percent, qualifies, stake_distribution, ArbitrageOpportunity,
    OpportunityLeg,
};
use super::combination::Combination;
use crate::market::{Event, MarketRole, Outcome};
use crate::orderbook::BestOdds;

/// Thresholds applied when evaluating combinations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationParams {
    /// Minimum profit percentage to report.
    pub min_profit_percent: f64,
    /// Total stake the distribution is computed for, display units.
    pub target_stake_total: Decimal,
}

/// How one combination fared.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CombinationStatus {
    /// The event has no market for a leg's role.
    MissingMarket { role: MarketRole },
    /// A leg's market has no usable price for the outcome.
    MissingPrice { role: MarketRole, outcome: Outcome },
    /// All legs priced but the book is not under 1.
    NoArbitrage { arbitrage_value: f64 },
    /// Under 1 but profit is below the configured minimum.
    BelowThreshold { arbitrage_value: f64, profit_percent: f64 },
    /// Reported as an opportunity.
    Qualifies { arbitrage_value: f64, profit_percent: f64 },
}

impl CombinationStatus {
    /// Arbitrage value, when every leg was priced.
    pub fn arbitrage_value(&self) -> Option<f64> {
        match self {
            Self::NoArbitrage { arbitrage_value }
            | Self::BelowThreshold { arbitrage_value, .. }
            | Self::Qualifies { arbitrage_value, .. } => Some(*arbitrage_value),
            Self::MissingMarket { .. } | Self::MissingPrice { .. } => None,
        }
    }
}

/// Outcome of evaluating one combination for one event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinationReport {
    /// Combination name.
    pub combination: String,
    /// Result.
    #[serde(flatten)]
    pub status: CombinationStatus,
}

impl fmt::Display for CombinationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            CombinationStatus::MissingMarket { role } => {
                write!(f, "{}: skipped (no {role} market)", self.combination)
            }
            CombinationStatus::MissingPrice { role, outcome } => {
                write!(f, "{}: skipped (no {role} {outcome} price)", self.combination)
            }
            CombinationStatus::NoArbitrage { arbitrage_value } => {
                write!(f, "{}: {arbitrage_value:.4} no arbitrage", self.combination)
            }
            CombinationStatus::BelowThreshold {
                arbitrage_value,
                profit_percent,
            } => write!(
                f,
                "{}: {arbitrage_value:.4} profit {profit_percent:.2}% below threshold",
                self.combination
            ),
            CombinationStatus::Qualifies {
                arbitrage_value,
                profit_percent,
            } => write!(
                f,
                "{}: {arbitrage_value:.4} ARBITRAGE profit {profit_percent:.2}%",
                self.combination
            ),
        }
    }
}

/// Everything found while evaluating one event.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EventEvaluation {
    /// Event identifier.
    pub event_id: String,
    /// Qualifying opportunities, in combination order.
    pub opportunities: Vec<ArbitrageOpportunity>,
    /// One report per configured combination.
    pub reports: Vec<CombinationReport>,
}

impl EventEvaluation {
    /// Lowest arbitrage value seen among fully priced combinations.
    pub fn best_arbitrage_value(&self) -> Option<f64> {
        self.reports
            .iter()
            .filter_map(|r| r.status.arbitrage_value())
            .min_by(|a, b| a.total_cmp(b))
    }
}

/// Evaluate every combination against the event's current snapshots.
///
/// `snapshot` looks up the latest [`BestOdds`] for a market id. Combinations
/// with a missing market or price are reported as skipped; this never fails.
#[instrument(skip_all, fields(event = %event.event_id))]
pub fn evaluate_event<F>(
    event: &Event,
    snapshot: F,
    combinations: &[Combination],
    params: &EvaluationParams,
) -> EventEvaluation
where
    F: Fn(&str) -> Option<BestOdds>,
{
    let mut evaluation = EventEvaluation {
        event_id: event.event_id.clone(),
        ..Default::default()
    };

    for combination in combinations {
        let (status, opportunity) = evaluate_combination(event, &snapshot, combination, params);

        match &status {
            CombinationStatus::Qualifies {
                arbitrage_value,
                profit_percent,
            } => info!(
                combination = %combination.name,
                arbitrage_value,
                profit_percent,
                "Arbitrage opportunity detected"
            ),
            other => debug!(combination = %combination.name, status = ?other, "No opportunity"),
        }

        evaluation.reports.push(CombinationReport {
            combination: combination.name.clone(),
            status,
        });
        evaluation.opportunities.extend(opportunity);
    }

    evaluation
}

fn evaluate_combination<F>(
    event: &Event,
    snapshot: &F,
    combination: &Combination,
    params: &EvaluationParams,
) -> (CombinationStatus, Option<ArbitrageOpportunity>)
where
    F: Fn(&str) -> Option<BestOdds>,
{
    let mut legs = Vec::with_capacity(combination.len());

    for leg in &combination.legs {
        let Some(market) = event.market(leg.role) else {
            return (CombinationStatus::MissingMarket { role: leg.role }, None);
        };
        let missing_price = CombinationStatus::MissingPrice {
            role: leg.role,
            outcome: leg.outcome,
        };
        let Some(best) = snapshot(&market.market_id) else {
            return (missing_price, None);
        };
        let Some(quote) = best.quote(leg.outcome) else {
            return (missing_price, None);
        };

        legs.push(OpportunityLeg {
            role: leg.role,
            outcome: leg.outcome,
            market_id: market.market_id.clone(),
            outcome_label: market.outcome_label(leg.outcome).to_string(),
            order_id: quote.order_id.clone(),
            decimal_odds: quote.decimal_odds,
            fillable: quote.fillable,
        });
    }

    let odds: Vec<f64> = legs.iter().map(|l| l.decimal_odds).collect();
    let value = arbitrage_value(&odds);

    if value.is_nan() || value >= 1.0 {
        return (CombinationStatus::NoArbitrage { arbitrage_value: value }, None);
    }

    let profit = profit_percent(value);
    if !qualifies(value, params.min_profit_percent) {
        return (
            CombinationStatus::BelowThreshold {
                arbitrage_value: value,
                profit_percent: profit,
            },
            None,
        );
    }

    let opportunity = ArbitrageOpportunity {
        event_id: event.event_id.clone(),
        event_title: event.title(),
        league_label: event.league_label.clone(),
        combination: combination.name.clone(),
        stakes: stake_distribution(&odds, value, params.target_stake_total),
        legs,
        arbitrage_value: value,
        profit_percent: profit,
        detected_at: OffsetDateTime::now_utc(),
    };

    (
        CombinationStatus::Qualifies {
            arbitrage_value: value,
            profit_percent: profit,
        },
        Some(opportunity),
    )
}
