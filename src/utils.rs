//! Utility functions.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::orderbook::Order;

/// Resolve when the process receives Ctrl-C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

/// Split a flat order list into one full order set per requested market.
///
/// Every requested market gets an entry, empty when it has no orders, so a
/// market whose book emptied is still updated. Orders for markets that were
/// not requested are kept under their own id.
pub fn group_by_market(market_ids: &[String], orders: Vec<Order>) -> HashMap<String, Vec<Order>> {
    let mut grouped: HashMap<String, Vec<Order>> = market_ids
        .iter()
        .map(|id| (id.clone(), Vec::new()))
        .collect();

    for order in orders {
        grouped.entry(order.market_id.clone()).or_default().push(order);
    }

    grouped
}
