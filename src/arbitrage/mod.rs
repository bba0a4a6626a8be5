//! Arbitrage module for detecting opportunities across an event's markets.
//!
//! This module handles:
//! - Outcome combinations and their text form
//! - Arbitrage value, profit and stake calculations
//! - Per-event detection and the engine owning the snapshot cache

pub mod calculator;
pub mod combination;
pub mod detector;
pub mod engine;

pub use calculator::{
    arbitrage_value, profit_percent, stake_distribution, ArbitrageOpportunity, OpportunityLeg,
    StakeDistribution,
};
pub use combination::{one_x_two, parse_combinations, Combination, Leg};
pub use detector::{evaluate_event, CombinationReport, CombinationStatus, EventEvaluation};
pub use engine::{ArbEngine, EngineBuilder, EngineConfig, EngineStats, MarketUpdate};
