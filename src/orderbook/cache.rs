//! Per-market cache of the latest best-odds snapshot.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::types::BestOdds;

/// Latest [`BestOdds`] per market, used for change detection.
///
/// Replacement for a given market runs under that key's shard lock, so
/// concurrent updates for one market are serialized while different markets
/// proceed independently.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    snapshots: DashMap<String, BestOdds>,
}

impl SnapshotCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute and store a new snapshot for `market_id`.
    ///
    /// `compute` runs while the market's entry is locked and receives the
    /// previous snapshot, if any. The new snapshot always replaces the old
    /// one; the returned flag is `true` when prices or sizes differ from the
    /// previous snapshot, or when there was none.
    pub fn update_with<F, T>(&self, market_id: &str, compute: F) -> (BestOdds, bool, T)
    where
        F: FnOnce(Option<&BestOdds>) -> (BestOdds, T),
    {
        match self.snapshots.entry(market_id.to_string()) {
            Entry::Occupied(mut entry) => {
                let (snapshot, extra) = compute(Some(entry.get()));
                let changed = !entry.get().same_prices_as(&snapshot);
                entry.insert(snapshot.clone());
                (snapshot, changed, extra)
            }
            Entry::Vacant(entry) => {
                let (snapshot, extra) = compute(None);
                entry.insert(snapshot.clone());
                (snapshot, true, extra)
            }
        }
    }

    /// Store a precomputed snapshot, returning whether it changed.
    pub fn replace(&self, snapshot: BestOdds) -> bool {
        let market_id = snapshot.market_id.clone();
        let (_, changed, ()) = self.update_with(&market_id, |_| (snapshot, ()));
        changed
    }

    /// Get a copy of a market's snapshot.
    pub fn get(&self, market_id: &str) -> Option<BestOdds> {
        self.snapshots.get(market_id).map(|s| s.value().clone())
    }

    /// Drop a market from the cache.
    pub fn remove(&self, market_id: &str) -> Option<BestOdds> {
        self.snapshots.remove(market_id).map(|(_, s)| s)
    }

    /// Copies of every cached snapshot.
    pub fn all(&self) -> Vec<BestOdds> {
        self.snapshots.iter().map(|s| s.value().clone()).collect()
    }

    /// Number of markets in cache.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderbook::types::Quote;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    fn snapshot(market_id: &str, odds: f64, fillable: u128) -> BestOdds {
        let mut best = BestOdds::empty(market_id);
        best.outcome_one = Some(Quote {
            order_id: "o".to_string(),
            decimal_odds: odds,
            fillable,
        });
        best
    }

    #[test]
    fn first_snapshot_counts_as_changed() {
        let cache = SnapshotCache::new();
        assert!(cache.replace(snapshot("m", 2.0, 10)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn identical_snapshot_is_not_a_change() {
        let cache = SnapshotCache::new();
        cache.replace(snapshot("m", 2.0, 10));
        assert!(!cache.replace(snapshot("m", 2.0, 10)));
        assert!(cache.replace(snapshot("m", 2.0, 9)));
        assert!(cache.replace(snapshot("m", 2.1, 9)));
    }

    #[test]
    fn compute_sees_previous_snapshot() {
        let cache = SnapshotCache::new();
        cache.replace(snapshot("m", 2.0, 10));

        let (_, changed, had_previous) =
            cache.update_with("m", |prev| (snapshot("m", 2.0, 10), prev.is_some()));

        assert!(had_previous);
        assert!(!changed);
    }

    #[test]
    fn remove_and_get() {
        let cache = SnapshotCache::new();
        cache.replace(snapshot("a", 2.0, 10));
        cache.replace(snapshot("b", 3.0, 10));

        assert_eq!(cache.get("a").unwrap().price(crate::market::Outcome::One), Some(2.0));
        assert!(cache.remove("a").is_some());
        assert!(cache.get("a").is_none());
        assert_eq!(cache.all().len(), 1);
    }

    #[test]
    fn concurrent_updates_to_distinct_markets() {
        let cache = Arc::new(SnapshotCache::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for n in 0..50u128 {
                        cache.replace(snapshot(&format!("m{i}"), 2.0, n));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 8);
        assert_eq!(cache.get("m3").unwrap().outcome_one.unwrap().fillable, 49);
    }

    #[test]
    fn concurrent_updates_to_one_market_are_serialized() {
        let cache = Arc::new(SnapshotCache::new());
        let computing = Arc::new(AtomicBool::new(false));
        let changes = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8u128)
            .map(|thread| {
                let cache = Arc::clone(&cache);
                let computing = Arc::clone(&computing);
                let changes = Arc::clone(&changes);
                std::thread::spawn(move || {
                    for n in 0..50u128 {
                        let (_, changed, ()) = cache.update_with("m", |_| {
                            assert!(
                                !computing.swap(true, Ordering::SeqCst),
                                "two computations overlapped"
                            );
                            std::thread::yield_now();
                            computing.store(false, Ordering::SeqCst);
                            (snapshot("m", 2.0, thread * 1_000 + n), ())
                        });
                        if changed {
                            changes.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // every fillable value is distinct, so each update is a change
        assert_eq!(changes.load(Ordering::SeqCst), 400);
        assert_eq!(cache.len(), 1);
        let fillable = cache.get("m").unwrap().outcome_one.unwrap().fillable;
        assert_eq!(fillable % 1_000, 49);
    }
}
