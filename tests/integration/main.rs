//! End-to-end tests for the odds pipeline.
//!
//! The engine tests run against the in-memory order source. The live tests
//! hit the public SX.bet API and are ignored by default.
//! Run them with: cargo test --test integration -- --ignored

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sxbet_arb::api::AppState;
use sxbet_arb::arbitrage::{CombinationStatus, EventEvaluation};
use sxbet_arb::market::{
    required_roles, spawn_poller, ClassificationRules, Market, MarketCatalog, MockOrderBuilder,
    MockOrderSource, OrderSource, SxBetClient,
};
use sxbet_arb::report::ReportSink;
use sxbet_arb::utils::group_by_market;
use sxbet_arb::{ArbEngine, Config};
use tokio::sync::{mpsc, Semaphore};

const EVENT: &str = "L7731";
const HOME: &str = "0xarsenal";
const TIE: &str = "0xtie";
const AWAY: &str = "0xchelsea";

fn market(id: &str, label: &str) -> Market {
    Market {
        market_id: id.to_string(),
        event_id: EVENT.to_string(),
        market_type: 1,
        outcome_one_label: label.to_string(),
        outcome_two_label: format!("Not {label}"),
        team_one_name: "Arsenal".to_string(),
        team_two_name: "Chelsea".to_string(),
        league_label: Some("Premier League".to_string()),
        game_time: None,
    }
}

fn test_catalog(engine: &ArbEngine) -> MarketCatalog {
    let markets = vec![
        market(HOME, "Arsenal"),
        market(TIE, "Tie"),
        market(AWAY, "Chelsea"),
    ];
    let required = required_roles(&engine.config().combinations);
    MarketCatalog::build(markets, &ClassificationRules::default(), &required)
}

/// Post one YES order per market at the given taker odds.
fn post_yes_odds(source: &MockOrderSource, home: f64, tie: f64, away: f64) {
    for (id, odds) in [(HOME, home), (TIE, tie), (AWAY, away)] {
        source.set_orders(id, MockOrderBuilder::new(id).yes(odds, 100).build());
    }
}

/// Fetch, apply and evaluate once, the way the scan command does.
async fn run_pass(
    engine: &ArbEngine,
    catalog: &MarketCatalog,
    source: &dyn OrderSource,
) -> EventEvaluation {
    let ids = catalog.market_ids();
    let orders = source.fetch_orders(&ids).await.unwrap();
    for (market_id, orders) in group_by_market(&ids, orders) {
        engine.apply_orders(&market_id, &orders);
    }
    engine.evaluate_event(catalog.event(EVENT).unwrap())
}

fn yes_value(evaluation: &EventEvaluation) -> f64 {
    evaluation.reports[0].status.arbitrage_value().unwrap()
}

#[tokio::test]
async fn overround_books_report_no_arbitrage() {
    let engine = ArbEngine::builder().build().unwrap();
    let catalog = test_catalog(&engine);
    let source = MockOrderSource::new();

    for ((home, tie, away), expected) in [
        ((2.10, 3.40, 2.05), 1.2581),
        ((2.10, 15.0, 2.05), 1.0307),
        ((2.50, 10.0, 1.02), 1.4804),
    ] {
        post_yes_odds(&source, home, tie, away);
        let evaluation = run_pass(&engine, &catalog, &source).await;

        assert!(evaluation.opportunities.is_empty());
        assert!((yes_value(&evaluation) - expected).abs() < 1e-3);
        assert!(matches!(
            evaluation.reports[0].status,
            CombinationStatus::NoArbitrage { .. }
        ));
        // nobody offers the NO side
        assert!(matches!(
            evaluation.reports[1].status,
            CombinationStatus::MissingPrice { .. }
        ));
    }
}

#[tokio::test]
async fn underround_book_is_reported_with_stakes() {
    let engine = ArbEngine::builder()
        .target_stake_total(dec!(90))
        .build()
        .unwrap();
    let catalog = test_catalog(&engine);
    let source = MockOrderSource::new();

    let odds = 1.0 / 0.30;
    post_yes_odds(&source, odds, odds, odds);
    let evaluation = run_pass(&engine, &catalog, &source).await;

    assert_eq!(evaluation.opportunities.len(), 1);
    let opportunity = &evaluation.opportunities[0];
    assert!((opportunity.arbitrage_value - 0.90).abs() < 1e-6);
    assert!((opportunity.profit_percent - 11.11).abs() < 0.01);
    assert_eq!(opportunity.event_title, "Arsenal vs Chelsea");
    assert_eq!(opportunity.legs.len(), 3);

    let stakes = &opportunity.stakes;
    let staked: Decimal = stakes.stakes.iter().sum();
    assert!((staked - dec!(90)).abs() < dec!(0.000001));
    assert!((stakes.guaranteed_return - dec!(100)).abs() < dec!(0.0001));
    assert_eq!(stakes.guaranteed_profit, stakes.guaranteed_return - dec!(90));
    assert_eq!(engine.stats().opportunities, 1);
}

#[tokio::test]
async fn only_best_order_changes_are_signalled() {
    let engine = ArbEngine::builder().build().unwrap();
    let source = MockOrderSource::new();
    let ids = vec![HOME.to_string()];

    source.set_orders(
        HOME,
        MockOrderBuilder::new(HOME).yes(2.2, 50).yes(2.0, 50).no(1.7, 50).build(),
    );

    let orders = source.fetch_orders(&ids).await.unwrap();
    assert!(engine.apply_orders(HOME, &orders).changed);
    assert!(!engine.apply_orders(HOME, &orders).changed);

    // a fill on the worse YES order leaves the best odds untouched
    source.set_orders(
        HOME,
        MockOrderBuilder::new(HOME)
            .yes(2.2, 50)
            .yes_filled(2.0, 50, 20)
            .no(1.7, 50)
            .build(),
    );
    let orders = source.fetch_orders(&ids).await.unwrap();
    assert!(!engine.apply_orders(HOME, &orders).changed);

    // a fill on the best one is a single change
    source.set_orders(
        HOME,
        MockOrderBuilder::new(HOME)
            .yes_filled(2.2, 50, 20)
            .yes_filled(2.0, 50, 20)
            .no(1.7, 50)
            .build(),
    );
    let orders = source.fetch_orders(&ids).await.unwrap();
    assert!(engine.apply_orders(HOME, &orders).changed);
    assert!(!engine.apply_orders(HOME, &orders).changed);

    assert_eq!(engine.stats().changes, 2);
}

#[tokio::test]
async fn pollers_feed_engine_and_sinks() {
    let engine = Arc::new(ArbEngine::builder().build().unwrap());
    let catalog = test_catalog(&engine);
    let state = AppState::new(engine.clone(), None);

    let source = Arc::new(MockOrderSource::new());
    let odds = 1.0 / 0.30;
    post_yes_odds(&source, odds, odds, odds);

    let (tx, mut rx) = mpsc::channel(16);
    let limiter = Arc::new(Semaphore::new(2));
    let pollers: Vec<_> = catalog
        .market_ids()
        .into_iter()
        .map(|id| {
            spawn_poller(
                source.clone(),
                id,
                Duration::from_millis(10),
                limiter.clone(),
                tx.clone(),
            )
        })
        .collect();
    drop(tx);

    let mut seen = HashSet::new();
    while seen.len() < 3 {
        let update = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        seen.insert(update.market_id.clone());

        let result = engine.apply_orders(&update.market_id, &update.orders);
        if result.changed {
            let event = catalog.event_for_market(&update.market_id).unwrap();
            let evaluation = engine.evaluate_event(event);
            state.event_evaluated(event, &evaluation);
        }
    }

    for poller in &pollers {
        poller.abort();
    }

    let recent = state.recent_opportunities();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].event_id, EVENT);
    assert_eq!(engine.stats().markets, 3);
}

/// Test fetching active soccer markets and building the catalog.
#[tokio::test]
#[ignore = "requires network access"]
async fn test_live_catalog() {
    let config = Config::default();
    let client = SxBetClient::new(&config).unwrap();

    let markets = client.fetch_active_markets().await.unwrap();
    println!("Active markets: {}", markets.len());

    let required = required_roles(&config.combinations().unwrap());
    let catalog = MarketCatalog::build(markets, &config.classification_rules(), &required);
    println!("Complete events: {}", catalog.len());

    for event in catalog.events().take(5) {
        println!("  {} ({} markets)", event.title(), event.markets.len());
    }
}

/// Test a full scan pass against the live API.
#[tokio::test]
#[ignore = "requires network access"]
async fn test_live_scan_pass() {
    let config = Config::default();
    let engine = ArbEngine::from_config(&config).unwrap();
    let client = SxBetClient::new(&config).unwrap();

    let markets = client.fetch_active_markets().await.unwrap();
    let required = required_roles(&config.combinations().unwrap());
    let catalog = MarketCatalog::build(markets, &config.classification_rules(), &required);

    let Some(event) = catalog.events().next() else {
        println!("Skipping: no complete events right now");
        return;
    };
    let ids: Vec<String> = event.market_ids().map(str::to_string).collect();

    let orders = client.fetch_orders(&ids).await.unwrap();
    for (market_id, orders) in group_by_market(&ids, orders) {
        let update = engine.apply_orders(&market_id, &orders);
        println!(
            "  {} anomalies={} yes={:?} no={:?}",
            market_id,
            update.anomalies.len(),
            update.snapshot.outcome_one.map(|q| q.decimal_odds),
            update.snapshot.outcome_two.map(|q| q.decimal_odds)
        );
    }

    let evaluation = engine.evaluate_event(event);
    for report in &evaluation.reports {
        println!("  {}", report);
    }
}
