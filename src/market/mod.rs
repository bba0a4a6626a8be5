//! Market module for SX.bet soccer markets.
//!
//! This module handles:
//! - Market, event and league types
//! - Grouping markets into complete events
//! - SX.bet REST client and the order source trait
//! - Polling tasks that push order updates
//! - Mock order source for testing

pub mod catalog;
pub mod client;
pub mod mock;
pub mod poller;
pub mod types;

pub use catalog::{required_roles, ClassificationRules, MarketCatalog};
pub use client::{OrderSource, SxBetClient};
pub use mock::{MockOrderBuilder, MockOrderSource};
pub use poller::{spawn_poller, OrderUpdate};
pub use types::{Event, League, Market, MarketData, MarketRole, Outcome};
