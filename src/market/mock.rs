//! Mock order source for unit testing.
//!
//! This module provides an in-memory [`OrderSource`] that can be used in
//! tests without making real network requests.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;

use super::client::OrderSource;
use crate::error::MarketError;
use crate::orderbook::odds::numerator_for_odds;
use crate::orderbook::Order;

/// In-memory order source.
#[derive(Debug, Default)]
pub struct MockOrderSource {
    /// Order sets by market id.
    books: DashMap<String, Vec<Order>>,
    /// Fail every fetch while set.
    fail: AtomicBool,
    /// Simulated latency in milliseconds.
    latency_ms: AtomicU64,
    /// Number of fetch calls served.
    calls: AtomicU64,
}

impl MockOrderSource {
    /// Create an empty mock source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the order set of a market.
    pub fn set_orders(&self, market_id: impl Into<String>, orders: Vec<Order>) {
        self.books.insert(market_id.into(), orders);
    }

    /// Remove a market's orders.
    pub fn clear_market(&self, market_id: &str) {
        self.books.remove(market_id);
    }

    /// Make subsequent fetches fail (or succeed again).
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::Relaxed);
    }

    /// Delay every fetch.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Number of fetches served so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl OrderSource for MockOrderSource {
    async fn fetch_orders(&self, market_ids: &[String]) -> Result<Vec<Order>, MarketError> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        let latency = self.latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self.fail.load(Ordering::Relaxed) {
            return Err(MarketError::RequestFailed {
                endpoint: "/orders".to_string(),
                reason: "Mock order source failure".to_string(),
            });
        }

        Ok(market_ids
            .iter()
            .filter_map(|id| self.books.get(id).map(|orders| orders.value().clone()))
            .flatten()
            .collect())
    }
}

/// Builder for test orders expressed in taker terms.
#[derive(Debug, Clone)]
pub struct MockOrderBuilder {
    market_id: String,
    decimals: u32,
    orders: Vec<Order>,
}

impl MockOrderBuilder {
    /// Orders for `market_id` with sizes in a 6-decimal token.
    pub fn new(market_id: impl Into<String>) -> Self {
        Self {
            market_id: market_id.into(),
            decimals: 6,
            orders: Vec::new(),
        }
    }

    fn push(mut self, taker_yes: bool, odds: f64, maker_size: u64, filled: u64) -> Self {
        let unit = 10i128.pow(self.decimals);
        let id = format!("{}-{}", self.market_id, self.orders.len());
        self.orders.push(Order {
            order_id: id,
            market_id: self.market_id.clone(),
            maker_is_betting_outcome_one: !taker_yes,
            implied_probability: Some(numerator_for_odds(odds) as i128),
            total_size: i128::from(maker_size) * unit,
            filled_size: i128::from(filled) * unit,
        });
        self
    }

    /// A maker order a taker fills to back outcome one at `odds`.
    pub fn yes(self, odds: f64, maker_size: u64) -> Self {
        self.push(true, odds, maker_size, 0)
    }

    /// A maker order a taker fills to back outcome two at `odds`.
    pub fn no(self, odds: f64, maker_size: u64) -> Self {
        self.push(false, odds, maker_size, 0)
    }

    /// A partially filled order backing outcome one for the taker.
    pub fn yes_filled(self, odds: f64, maker_size: u64, filled: u64) -> Self {
        self.push(true, odds, maker_size, filled)
    }

    /// Build the orders.
    pub fn build(self) -> Vec<Order> {
        self.orders
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Outcome;

    #[tokio::test]
    async fn mock_source_returns_requested_markets() {
        let source = MockOrderSource::new();
        source.set_orders("a", MockOrderBuilder::new("a").yes(2.0, 10).build());
        source.set_orders("b", MockOrderBuilder::new("b").no(3.0, 10).no(2.5, 5).build());

        let orders = source
            .fetch_orders(&["b".to_string(), "missing".to_string()])
            .await
            .unwrap();

        assert_eq!(orders.len(), 2);
        assert!(orders.iter().all(|o| o.market_id == "b"));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn mock_source_failure_mode() {
        let source = MockOrderSource::new();
        source.set_failing(true);
        assert!(source.fetch_orders(&["a".to_string()]).await.is_err());

        source.set_failing(false);
        assert!(source.fetch_orders(&["a".to_string()]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mock_source_latency_and_cleared_markets() {
        let source = MockOrderSource::new();
        let ids = vec!["a".to_string()];
        source.set_orders("a", MockOrderBuilder::new("a").yes(2.0, 10).build());
        source.set_latency(Duration::from_millis(20));

        let started = tokio::time::Instant::now();
        assert_eq!(source.fetch_orders(&ids).await.unwrap().len(), 1);
        assert!(started.elapsed() >= Duration::from_millis(20));

        source.clear_market("a");
        assert!(source.fetch_orders(&ids).await.unwrap().is_empty());
        assert_eq!(source.calls(), 2);
    }

    #[test]
    fn builder_sets_taker_side_and_units() {
        let orders = MockOrderBuilder::new("m")
            .yes(2.0, 10)
            .no(4.0, 3)
            .yes_filled(1.5, 10, 4)
            .build();

        assert_eq!(orders[0].taker_outcome(), Outcome::One);
        assert_eq!(orders[1].taker_outcome(), Outcome::Two);
        assert_eq!(orders[0].total_size, 10_000_000);
        assert_eq!(orders[2].filled_size, 4_000_000);
        assert_eq!(orders[1].order_id, "m-1");
    }
}
