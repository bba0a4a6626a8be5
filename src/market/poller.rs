//! Push-style order delivery built on a polling [`OrderSource`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use super::client::OrderSource;
use crate::orderbook::Order;

/// Full order set for one market.
#[derive(Debug, Clone)]
pub struct OrderUpdate {
    /// Market hash.
    pub market_id: String,
    /// Every resting order of the market.
    pub orders: Vec<Order>,
}

/// Poll one market every `interval`, sending each result as an [`OrderUpdate`].
///
/// `limiter` bounds concurrent fetches across all pollers. Failed fetches are
/// logged and retried on the next tick. The task ends once the receiver is
/// dropped or the limiter is closed.
pub fn spawn_poller(
    source: Arc<dyn OrderSource>,
    market_id: String,
    interval: Duration,
    limiter: Arc<Semaphore>,
    tx: mpsc::Sender<OrderUpdate>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let ids = [market_id.clone()];

        loop {
            ticker.tick().await;

            let result = {
                let Ok(_permit) = limiter.acquire().await else {
                    debug!(%market_id, "Limiter closed, stopping poller");
                    break;
                };
                source.fetch_orders(&ids).await
            };

            match result {
                Ok(orders) => {
                    let update = OrderUpdate {
                        market_id: market_id.clone(),
                        orders,
                    };
                    if tx.send(update).await.is_err() {
                        debug!(%market_id, "Receiver dropped, stopping poller");
                        break;
                    }
                }
                Err(e) => warn!(%market_id, error = %e, "Order fetch failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{MockOrderBuilder, MockOrderSource};

    #[tokio::test]
    async fn poller_sends_full_sets_until_receiver_drops() {
        let source = Arc::new(MockOrderSource::new());
        source.set_orders("m", MockOrderBuilder::new("m").yes(2.0, 10).no(1.8, 10).build());

        let (tx, mut rx) = mpsc::channel(4);
        let handle = spawn_poller(
            source.clone(),
            "m".to_string(),
            Duration::from_millis(5),
            Arc::new(Semaphore::new(1)),
            tx,
        );

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.market_id, "m");
        assert_eq!(first.orders.len(), 2);
        assert_eq!(second.orders, first.orders);

        drop(rx);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(source.calls() >= 2);
    }

    #[tokio::test]
    async fn poller_survives_failed_fetches() {
        let source = Arc::new(MockOrderSource::new());
        source.set_failing(true);

        let (tx, mut rx) = mpsc::channel(4);
        let handle = spawn_poller(
            source.clone(),
            "m".to_string(),
            Duration::from_millis(5),
            Arc::new(Semaphore::new(1)),
            tx,
        );

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(rx.try_recv().is_err());

        source.set_failing(false);
        let update = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(update.orders.is_empty());
        handle.abort();
    }
}
