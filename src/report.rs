//! Reporting sinks for snapshots and opportunities.

use std::fmt::Write as _;

use tracing::{debug, info};

use crate::arbitrage::{ArbitrageOpportunity, EventEvaluation};
use crate::market::{Event, Outcome};
use crate::orderbook::{to_display_units, BestOdds};

/// Receives engine output.
pub trait ReportSink: Send + Sync {
    /// A market's best odds changed.
    fn snapshot_changed(&self, snapshot: &BestOdds);

    /// An event was evaluated.
    fn event_evaluated(&self, event: &Event, evaluation: &EventEvaluation);
}

/// Sink writing reports to the tracing log.
#[derive(Debug, Clone)]
pub struct LogSink {
    verbose: bool,
    token_decimals: u32,
}

impl LogSink {
    /// Create a log sink; `verbose` also logs every non-qualifying combination.
    pub fn new(verbose: bool, token_decimals: u32) -> Self {
        Self {
            verbose,
            token_decimals,
        }
    }
}

impl ReportSink for LogSink {
    fn snapshot_changed(&self, snapshot: &BestOdds) {
        debug!(
            market_id = %snapshot.market_id,
            yes = %format_price(snapshot, Outcome::One),
            no = %format_price(snapshot, Outcome::Two),
            "Best odds updated"
        );
    }

    fn event_evaluated(&self, event: &Event, evaluation: &EventEvaluation) {
        for opportunity in &evaluation.opportunities {
            info!(
                event = %event.title(),
                combination = %opportunity.combination,
                profit_percent = format_args!("{:.2}", opportunity.profit_percent),
                "ARBITRAGE\n{}",
                format_opportunity(opportunity, self.token_decimals)
            );
        }

        if self.verbose {
            for report in &evaluation.reports {
                info!(event = %event.title(), "{report}");
            }
        }
    }
}

/// Best price of one side as text, `-` when there is none.
pub fn format_price(snapshot: &BestOdds, outcome: Outcome) -> String {
    snapshot
        .price(outcome)
        .map(|p| format!("{p:.3}"))
        .unwrap_or_else(|| "-".to_string())
}

/// Minor units as display text, e.g. `12.50`.
pub fn format_amount(minor: u128, decimals: u32) -> String {
    to_display_units(minor, decimals)
        .map(|d| d.round_dp(2).to_string())
        .unwrap_or_else(|| minor.to_string())
}

/// Multi-line description of an opportunity and its stakes.
pub fn format_opportunity(opportunity: &ArbitrageOpportunity, token_decimals: u32) -> String {
    let mut out = String::new();
    let league = opportunity.league_label.as_deref().unwrap_or("-");

    let _ = writeln!(out, "{} ({league})", opportunity.event_title);
    let _ = writeln!(
        out,
        "{}: arbitrage value {:.4}, profit {:.2}%",
        opportunity.combination, opportunity.arbitrage_value, opportunity.profit_percent
    );

    for (leg, stake) in opportunity.legs.iter().zip(&opportunity.stakes.stakes) {
        let _ = writeln!(
            out,
            "  {:<28} {} @ {:.3}  stake {:.2}  (fillable {})",
            leg.outcome_label,
            leg.outcome,
            leg.decimal_odds,
            stake,
            format_amount(leg.fillable, token_decimals)
        );
    }

    let _ = writeln!(
        out,
        "  total {:.2} returns {:.2}, profit {:.2}",
        opportunity.stakes.total_stake,
        opportunity.stakes.guaranteed_return,
        opportunity.stakes.guaranteed_profit
    );
    let _ = write!(
        out,
        "  max total at these prices {}",
        format_amount(opportunity.max_total_stake(), token_decimals)
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitrage::calculator::{stake_distribution, OpportunityLeg};
    use crate::market::MarketRole;
    use rust_decimal::Decimal;
    use time::OffsetDateTime;

    fn test_opportunity() -> ArbitrageOpportunity {
        let odds = 1.0 / 0.3;
        let leg = |role: MarketRole, label: &str| OpportunityLeg {
            role,
            outcome: Outcome::One,
            market_id: format!("0x{role}"),
            outcome_label: label.to_string(),
            order_id: "o".to_string(),
            decimal_odds: odds,
            fillable: 12_500_000,
        };
        ArbitrageOpportunity {
            event_id: "L1".to_string(),
            event_title: "Arsenal vs Chelsea".to_string(),
            league_label: Some("Premier League".to_string()),
            combination: "YES + YES + YES".to_string(),
            legs: vec![
                leg(MarketRole::TeamOne, "Arsenal"),
                leg(MarketRole::Tie, "Tie"),
                leg(MarketRole::TeamTwo, "Chelsea"),
            ],
            arbitrage_value: 0.9,
            profit_percent: 100.0 / 9.0,
            stakes: stake_distribution(&[odds, odds, odds], 0.9, Decimal::ONE_HUNDRED),
            detected_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn formats_amounts_in_display_units() {
        assert_eq!(format_amount(12_500_000, 6), "12.50");
        assert_eq!(format_amount(1, 6), "0.00");
    }

    #[test]
    fn opportunity_text_lists_every_leg() {
        let text = format_opportunity(&test_opportunity(), 6);

        assert!(text.starts_with("Arsenal vs Chelsea (Premier League)"));
        assert!(text.contains("profit 11.11%"));
        assert!(text.contains("stake 33.33"));
        assert!(text.contains("fillable 12.50"));
        assert!(text.contains("total 100.00 returns 111.11, profit 11.11"));
        // 12.5 fillable at 3.33 odds on a 0.9 book
        assert!(text.ends_with("max total at these prices 37.50"));
        assert_eq!(text.lines().count(), 7);
    }

    #[test]
    fn missing_price_is_a_dash() {
        let snapshot = BestOdds::empty("m");
        assert_eq!(format_price(&snapshot, Outcome::One), "-");
    }
}
