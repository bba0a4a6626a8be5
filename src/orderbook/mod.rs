//! Order book module: odds normalization and best-order selection.
//!
//! This module handles:
//! - Order and snapshot types
//! - Converting fixed-point implied probabilities into decimal odds
//! - Best taker price per outcome and the full taker ladder
//! - The per-market snapshot cache used for change detection

pub mod cache;
pub mod odds;
pub mod selection;
pub mod types;

pub use cache::SnapshotCache;
pub use odds::{decimal_odds, normalize_order, remaining_taker_size, to_display_units};
pub use selection::{select_best_odds, taker_ladder, Selection};
pub use types::{BestOdds, LadderEntry, NormalizedOrder, Order, Quote, TakerLadder, ODDS_DENOMINATOR};
