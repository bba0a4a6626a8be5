//! SX.bet soccer odds monitor and arbitrage scanner.
//!
//! SX.bet lists every 1X2 outcome of a fixture as its own binary market
//! ("Arsenal" vs "Not Arsenal", "Tie" vs "Not Tie", ...). Makers post orders
//! with a fixed-point implied probability; a taker filling one receives the
//! other outcome at decimal odds `1 / p`. When the best taker odds across the
//! markets of one fixture satisfy `Σ 1/odds < 1`, staking on every leg locks in
//! a profit whichever result happens.
//!
//! # Strategy
//!
//! ```text
//! Arsenal YES:  3.40  ->  0.294
//! Tie YES:      3.60  ->  0.278
//! Chelsea YES:  3.50  ->  0.286
//! ─────────────────────────────
//! Total:                  0.858 < 1.0 ✅
//! Profit:                 16.6% on the staked total
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types and order anomalies
//! - [`market`]: Market catalog, SX.bet client and order sources
//! - [`orderbook`]: Odds normalization, best-order selection, snapshot cache
//! - [`arbitrage`]: Combinations, calculations and the engine
//! - [`report`]: Reporting sinks
//! - [`api`]: HTTP API for health, status and metrics
//! - [`metrics`]: Prometheus metrics
//! - [`utils`]: Utility functions

pub mod api;
pub mod arbitrage;
pub mod config;
pub mod error;
pub mod market;
pub mod metrics;
pub mod orderbook;
pub mod report;
pub mod utils;

pub use arbitrage::ArbEngine;
pub use config::Config;
pub use error::{BotError, Result};
