//! The odds and arbitrage engine.
//!
//! [`ArbEngine`] owns the per-market snapshot cache. Order sets go in through
//! [`ArbEngine::apply_orders`], events are evaluated against the cached
//! snapshots with [`ArbEngine::evaluate_event`]. The engine performs no I/O.

use std::sync::atomic::{AtomicU64, Ordering};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use super::combination::{one_x_two, validate_combinations, Combination};
use super::detector::{evaluate_event, EvaluationParams, EventEvaluation};
use crate::config::Config;
use crate::error::{Anomaly, ConfigError};
use crate::market::Event;
use crate::metrics;
use crate::orderbook::odds::to_minor_units;
use crate::orderbook::{select_best_odds, BestOdds, Order, SnapshotCache};

/// Validated engine parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Minimum taker-fillable size, minor units.
    pub min_order_size: u128,
    /// Minimum profit percentage to report.
    pub min_profit_percent: f64,
    /// Total stake for stake distribution, display units.
    pub target_stake_total: Decimal,
    /// Combinations evaluated per event.
    pub combinations: Vec<Combination>,
}

/// Builder for [`ArbEngine`].
///
/// Amounts are given in display units and converted with `token_decimals`.
#[derive(Debug, Clone)]
pub struct EngineBuilder {
    token_decimals: u32,
    min_order_size: Decimal,
    min_profit_percent: Decimal,
    target_stake_total: Decimal,
    combinations: Vec<Combination>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            token_decimals: 6,
            min_order_size: Decimal::ONE,
            min_profit_percent: Decimal::new(5, 1),
            target_stake_total: Decimal::new(100, 0),
            combinations: one_x_two(),
        }
    }
}

impl EngineBuilder {
    /// Decimals of the base token.
    pub fn token_decimals(mut self, decimals: u32) -> Self {
        self.token_decimals = decimals;
        self
    }

    /// Minimum taker-fillable size, display units.
    pub fn min_order_size(mut self, size: Decimal) -> Self {
        self.min_order_size = size;
        self
    }

    /// Minimum profit percentage.
    pub fn min_profit_percent(mut self, percent: Decimal) -> Self {
        self.min_profit_percent = percent;
        self
    }

    /// Total stake for stake distribution, display units.
    pub fn target_stake_total(mut self, total: Decimal) -> Self {
        self.target_stake_total = total;
        self
    }

    /// Combinations to evaluate.
    pub fn combinations(mut self, combinations: Vec<Combination>) -> Self {
        self.combinations = combinations;
        self
    }

    /// Validate parameters and build the engine.
    pub fn build(self) -> Result<ArbEngine, ConfigError> {
        if self.min_order_size <= Decimal::ZERO {
            return Err(ConfigError::NotPositive {
                name: "min_order_size",
                value: self.min_order_size,
            });
        }
        if self.min_profit_percent < Decimal::ZERO {
            return Err(ConfigError::NegativeThreshold {
                name: "min_profit_percent",
                value: self.min_profit_percent,
            });
        }
        if self.target_stake_total <= Decimal::ZERO {
            return Err(ConfigError::NotPositive {
                name: "target_stake_total",
                value: self.target_stake_total,
            });
        }
        validate_combinations(&self.combinations)?;

        let min_order_size =
            to_minor_units("min_order_size", self.min_order_size, self.token_decimals)?;
        // below one minor unit the minimum would admit exhausted orders
        if min_order_size == 0 {
            return Err(ConfigError::NotPositive {
                name: "min_order_size",
                value: self.min_order_size,
            });
        }
        let min_profit_percent = to_f64("min_profit_percent", self.min_profit_percent)?;

        Ok(ArbEngine::new(EngineConfig {
            min_order_size,
            min_profit_percent,
            target_stake_total: self.target_stake_total,
            combinations: self.combinations,
        }))
    }
}

fn to_f64(name: &'static str, value: Decimal) -> Result<f64, ConfigError> {
    value.to_f64().ok_or(ConfigError::OutOfRange { name, value })
}

/// Result of applying a market's order set.
#[derive(Debug, Clone)]
pub struct MarketUpdate {
    /// New best-odds snapshot.
    pub snapshot: BestOdds,
    /// Whether any price or size differs from the previous snapshot.
    pub changed: bool,
    /// Orders excluded as malformed.
    pub anomalies: Vec<Anomaly>,
}

/// Engine counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// Order sets applied.
    pub updates: u64,
    /// Snapshots that changed.
    pub changes: u64,
    /// Malformed orders seen.
    pub anomalies: u64,
    /// Event evaluations.
    pub checks: u64,
    /// Opportunities found.
    pub opportunities: u64,
    /// Markets currently cached.
    pub markets: u64,
}

#[derive(Debug, Default)]
struct Counters {
    updates: AtomicU64,
    changes: AtomicU64,
    anomalies: AtomicU64,
    checks: AtomicU64,
    opportunities: AtomicU64,
}

/// Odds normalization, change detection and arbitrage evaluation.
#[derive(Debug)]
pub struct ArbEngine {
    config: EngineConfig,
    cache: SnapshotCache,
    counters: Counters,
}

impl ArbEngine {
    /// Start building an engine with default parameters.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Create an engine from validated parameters.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            cache: SnapshotCache::new(),
            counters: Counters::default(),
        }
    }

    /// Build an engine from application configuration.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Self::builder()
            .token_decimals(config.token_decimals)
            .min_order_size(config.min_order_size)
            .min_profit_percent(config.min_profit_percent)
            .target_stake_total(config.target_stake_total)
            .combinations(config.combinations()?)
            .build()
    }

    /// Engine parameters.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replace a market's order set and recompute its best odds.
    ///
    /// Every call is a full replacement for that market. Updates for the same
    /// market are serialized; `changed` compares against the snapshot stored
    /// by the previous call.
    #[instrument(skip(self, orders), fields(orders = orders.len()))]
    pub fn apply_orders(&self, market_id: &str, orders: &[Order]) -> MarketUpdate {
        let min_order_size = self.config.min_order_size;
        let (snapshot, changed, anomalies) = self.cache.update_with(market_id, |_| {
            let selection = select_best_odds(market_id, orders, min_order_size);
            (selection.best, selection.anomalies)
        });

        for anomaly in &anomalies {
            warn!(
                market_id = %anomaly.market_id,
                order_id = %anomaly.order_id,
                reason = %anomaly.kind,
                "Excluding malformed order"
            );
        }

        self.counters.updates.fetch_add(1, Ordering::Relaxed);
        self.counters
            .anomalies
            .fetch_add(anomalies.len() as u64, Ordering::Relaxed);
        metrics::inc_order_updates();
        metrics::add_anomalies(anomalies.len());

        if changed {
            self.counters.changes.fetch_add(1, Ordering::Relaxed);
            metrics::inc_snapshot_changes();
            debug!(
                one = ?snapshot.outcome_one.as_ref().map(|q| q.decimal_odds),
                two = ?snapshot.outcome_two.as_ref().map(|q| q.decimal_odds),
                "Best odds changed"
            );
        }

        MarketUpdate {
            snapshot,
            changed,
            anomalies,
        }
    }

    /// Evaluate every configured combination for an event.
    pub fn evaluate_event(&self, event: &Event) -> EventEvaluation {
        let _timer = metrics::timer_evaluation();
        let params = EvaluationParams {
            min_profit_percent: self.config.min_profit_percent,
            target_stake_total: self.config.target_stake_total,
        };

        let evaluation = evaluate_event(
            event,
            |market_id| self.cache.get(market_id),
            &self.config.combinations,
            &params,
        );

        self.counters.checks.fetch_add(1, Ordering::Relaxed);
        self.counters
            .opportunities
            .fetch_add(evaluation.opportunities.len() as u64, Ordering::Relaxed);
        metrics::inc_arbitrage_checks();
        metrics::add_opportunities_detected(evaluation.opportunities.len());

        evaluation
    }

    /// Latest snapshot for a market.
    pub fn snapshot(&self, market_id: &str) -> Option<BestOdds> {
        self.cache.get(market_id)
    }

    /// Latest snapshots for every market.
    pub fn snapshots(&self) -> Vec<BestOdds> {
        self.cache.all()
    }

    /// Drop a market (e.g. after it closed). Returns its last snapshot.
    pub fn forget_market(&self, market_id: &str) -> Option<BestOdds> {
        self.cache.remove(market_id)
    }

    /// Current counters.
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            updates: self.counters.updates.load(Ordering::Relaxed),
            changes: self.counters.changes.load(Ordering::Relaxed),
            anomalies: self.counters.anomalies.load(Ordering::Relaxed),
            checks: self.counters.checks.load(Ordering::Relaxed),
            opportunities: self.counters.opportunities.load(Ordering::Relaxed),
            markets: self.cache.len() as u64,
        }
    }
}
