//! SX.bet soccer odds monitor and arbitrage scanner entry point.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use time::format_description::well_known::Rfc3339;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Semaphore};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sxbet_arb::api::{create_router, AppState};
use sxbet_arb::arbitrage::{ArbEngine, EngineStats};
use sxbet_arb::config::{Config, LogFormat};
use sxbet_arb::market::{
    required_roles, spawn_poller, MarketCatalog, OrderSource, OrderUpdate, Outcome, SxBetClient,
};
use sxbet_arb::metrics;
use sxbet_arb::orderbook::taker_ladder;
use sxbet_arb::report::{format_amount, format_opportunity, format_price, LogSink, ReportSink};
use sxbet_arb::utils::{group_by_market, shutdown_signal};

/// Interval between monitor status lines.
const STATUS_INTERVAL: Duration = Duration::from_secs(60);

/// SX.bet soccer odds monitor and arbitrage scanner.
#[derive(Parser, Debug)]
#[command(name = "sxbet-arb")]
#[command(about = "Best-odds monitor and 1X2 arbitrage scanner for SX.bet soccer markets")]
#[command(version)]
struct Args {
    /// Enable debug logging and per-combination reports.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Continuously monitor every complete event (default).
    Monitor {
        /// HTTP server port for health/metrics (overrides PORT).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run a single pass over every complete event.
    Scan,

    /// List complete events and their classified markets.
    Events,

    /// List active leagues for the configured sport.
    Leagues,

    /// Print the taker ladder for one market.
    Orderbook {
        /// Market hash.
        market_id: String,
    },

    /// Check configuration validity.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging; commands reload and report configuration errors themselves
    init_tracing(&Config::load().unwrap_or_default(), args.verbose);

    // Handle subcommands
    match args.command {
        Some(Command::CheckConfig) => cmd_check_config().await,
        Some(Command::Leagues) => cmd_leagues().await,
        Some(Command::Events) => cmd_events().await,
        Some(Command::Orderbook { market_id }) => cmd_orderbook(market_id).await,
        Some(Command::Scan) => cmd_scan(args.verbose).await,
        Some(Command::Monitor { port }) => cmd_monitor(port, args.verbose).await,
        None => cmd_monitor(None, args.verbose).await,
    }
}

fn init_tracing(config: &Config, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("sxbet_arb=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.rust_log))
    };

    let json = matches!(config.log_format(), Ok(LogFormat::Json));

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(fmt::layer))
        .init();
}

/// Load and validate configuration, logging failures.
fn load_config() -> anyhow::Result<Config> {
    let config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    Ok(config)
}

/// Fetch active markets and group them into complete events.
async fn load_catalog(client: &SxBetClient, config: &Config) -> anyhow::Result<MarketCatalog> {
    let markets = client.fetch_active_markets().await?;
    let required = required_roles(&config.combinations()?);
    Ok(MarketCatalog::build(
        markets,
        &config.classification_rules(),
        &required,
    ))
}

/// Check configuration validity.
async fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("SXBET ARB - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  API URL: {}", config.sxbet_api_url);
    println!(
        "  API Key: {}",
        if config.sxbet_api_key.is_some() { "present" } else { "not set" }
    );
    println!("  Base Token: {} ({} decimals)", config.base_token, config.token_decimals);
    println!("  Sport: {} (main line only: {})", config.sport_id, config.only_main_line);
    println!("  Market Types: {:?}", config.market_types);
    println!("  Tie Labels: {}", config.tie_labels.join(", "));
    println!("  Min Order Size: {}", config.min_order_size);
    println!("  Min Profit: {}%", config.min_profit_percent);
    println!("  Target Stake Total: {}", config.target_stake_total);
    println!("  Combinations:");
    for combination in config.combinations()? {
        println!("    - {}", combination);
    }
    println!("  Poll Interval: {}ms", config.poll_interval_ms);
    println!("  HTTP Timeout: {}ms", config.http_timeout_ms);
    println!("  Max Concurrent Requests: {}", config.max_concurrent_requests);
    println!("  Log Format: {}", config.log_format()?);
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// List active leagues.
async fn cmd_leagues() -> anyhow::Result<()> {
    let config = load_config()?;
    let client = SxBetClient::new(&config)?;

    println!("======================================================================");
    println!("SXBET ARB - ACTIVE LEAGUES (sport {})", config.sport_id);
    println!("======================================================================");

    let leagues = client.fetch_active_leagues().await?;
    for league in &leagues {
        let events: u64 = league.events_by_type.values().sum();
        println!("  {:>8}  {:<48} {:>4} events", league.league_id, league.label, events);
    }

    println!("----------------------------------------------------------------------");
    println!("Total leagues: {}", leagues.len());
    println!("======================================================================");

    Ok(())
}

/// List complete events.
async fn cmd_events() -> anyhow::Result<()> {
    let config = load_config()?;
    let client = SxBetClient::new(&config)?;

    println!("======================================================================");
    println!("SXBET ARB - COMPLETE EVENTS");
    println!("======================================================================");

    let catalog = load_catalog(&client, &config).await?;

    for event in catalog.events() {
        println!(
            "\n{} ({})",
            event.title(),
            event.league_label.as_deref().unwrap_or("-")
        );
        println!("  Event: {}", event.event_id);
        let kickoff = event
            .markets
            .values()
            .find_map(|m| m.kickoff())
            .and_then(|k| k.format(&Rfc3339).ok())
            .unwrap_or_else(|| "-".to_string());
        println!("  Kick-off: {}", kickoff);
        for (role, market) in &event.markets {
            println!(
                "  {:<9} {}  {} / {}",
                role.to_string(),
                market.market_id,
                market.outcome_one_label,
                market.outcome_two_label
            );
        }
    }

    println!("\n----------------------------------------------------------------------");
    println!("Total complete events: {}", catalog.len());
    println!("======================================================================");

    Ok(())
}

/// Print the taker ladder of one market.
async fn cmd_orderbook(market_id: String) -> anyhow::Result<()> {
    let config = load_config()?;
    let client = SxBetClient::new(&config)?;

    println!("======================================================================");
    println!("SXBET ARB - ORDER BOOK");
    println!("======================================================================");
    println!("Market: {}", market_id);

    let orders = client.fetch_orders(std::slice::from_ref(&market_id)).await?;
    let (ladder, anomalies) = taker_ladder(&market_id, &orders);

    for outcome in [Outcome::One, Outcome::Two] {
        println!("----------------------------------------------------------------------");
        println!("Taker backs outcome {}:", outcome);
        println!(
            "  {:>8}  {:>8}  {:>14}  {:>8}  Order",
            "Odds", "Implied", "Fillable", "Filled"
        );

        let side = ladder.side(outcome);
        if side.is_empty() {
            println!("  (no orders)");
        }
        for entry in side {
            println!(
                "  {:>8.3}  {:>7.2}%  {:>14}  {:>7.1}%  {}",
                entry.decimal_odds,
                entry.implied_probability * 100.0,
                format_amount(entry.taker_fillable, config.token_decimals),
                entry.percent_filled,
                entry.order_id
            );
        }
        println!(
            "  Total fillable: {}",
            format_amount(ladder.total_fillable(outcome), config.token_decimals)
        );
    }

    if !anomalies.is_empty() {
        println!("----------------------------------------------------------------------");
        println!("Excluded orders:");
        for anomaly in &anomalies {
            println!("  {}", anomaly);
        }
    }
    println!("======================================================================");

    Ok(())
}

/// Single pass over every complete event.
async fn cmd_scan(verbose: bool) -> anyhow::Result<()> {
    let config = load_config()?;
    let engine = ArbEngine::from_config(&config)?;
    let client = SxBetClient::new(&config)?;
    let verbose = verbose || config.verbose;

    println!("======================================================================");
    println!("SXBET ARB - SCAN");
    println!("======================================================================");

    let catalog = load_catalog(&client, &config).await?;
    let market_ids = catalog.market_ids();

    let started = Instant::now();
    let orders = client.fetch_orders(&market_ids).await?;
    info!(
        markets = market_ids.len(),
        orders = orders.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Fetched orders"
    );

    let mut anomalies = 0usize;
    for (market_id, orders) in group_by_market(&market_ids, orders) {
        anomalies += engine.apply_orders(&market_id, &orders).anomalies.len();
    }

    let mut opportunities = 0usize;
    for event in catalog.events() {
        println!(
            "\n{} ({})",
            event.title(),
            event.league_label.as_deref().unwrap_or("-")
        );
        for (role, market) in &event.markets {
            if let Some(snapshot) = engine.snapshot(&market.market_id) {
                println!(
                    "  {:<9} {:<32} YES {:>8}  NO {:>8}",
                    role.to_string(),
                    market.outcome_one_label,
                    format_price(&snapshot, Outcome::One),
                    format_price(&snapshot, Outcome::Two)
                );
            }
        }

        let evaluation = engine.evaluate_event(event);
        if verbose {
            for report in &evaluation.reports {
                println!("  {}", report);
            }
        }
        for opportunity in &evaluation.opportunities {
            opportunities += 1;
            println!("  >>> ARBITRAGE");
            for line in format_opportunity(opportunity, config.token_decimals).lines() {
                println!("  {}", line);
            }
        }
    }

    println!("\n======================================================================");
    println!("SCAN SUMMARY");
    println!("======================================================================");
    println!("Events scanned: {}", catalog.len());
    println!("Markets: {}", market_ids.len());
    println!("Excluded orders: {}", anomalies);
    println!("Opportunities: {}", opportunities);
    println!("======================================================================");

    Ok(())
}

/// Continuous monitoring with per-market pollers.
async fn cmd_monitor(port: Option<u16>, verbose: bool) -> anyhow::Result<()> {
    info!("Loading configuration...");
    let config = load_config()?;
    let port = port.unwrap_or(config.port);

    let metrics_handle = match metrics::install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Prometheus recorder unavailable: {}", e);
            None
        }
    };

    let engine = Arc::new(ArbEngine::from_config(&config)?);
    let app_state = AppState::new(engine.clone(), metrics_handle);

    info!("Configuration loaded successfully");
    info!("Min profit: {}%", config.min_profit_percent);
    info!("Min order size: {}", config.min_order_size);
    info!("Poll interval: {}ms", config.poll_interval_ms);

    // Start HTTP server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    let router = create_router(app_state.clone());
    let _server_handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    });

    let client = Arc::new(SxBetClient::new(&config)?);

    info!("Loading active markets...");
    let catalog = load_catalog(&client, &config).await?;
    app_state.set_events(catalog.len());
    if catalog.is_empty() {
        warn!("No complete events found, nothing to monitor");
    }

    // One poller per market
    let market_ids = catalog.market_ids();
    let (tx, mut rx) = mpsc::channel::<OrderUpdate>(market_ids.len().max(1) * 2);
    let limiter = Arc::new(Semaphore::new(config.max_concurrent_requests));
    let source: Arc<dyn OrderSource> = client.clone();

    let pollers: Vec<_> = market_ids
        .iter()
        .map(|id| {
            spawn_poller(
                source.clone(),
                id.clone(),
                config.poll_interval(),
                limiter.clone(),
                tx.clone(),
            )
        })
        .collect();
    drop(tx);

    let sinks: Vec<Box<dyn ReportSink>> = vec![
        Box::new(LogSink::new(verbose || config.verbose, config.token_decimals)),
        Box::new(app_state.clone()),
    ];

    info!("========================================");
    info!("SXBET ARB MONITOR STARTED");
    info!("========================================");
    info!("Events: {}", catalog.len());
    info!("Markets: {}", market_ids.len());
    info!("========================================");

    let mut pending: HashSet<String> = market_ids.iter().cloned().collect();
    if pending.is_empty() {
        app_state.set_ready(true);
    }

    let started = Instant::now();
    let mut status = tokio::time::interval(STATUS_INTERVAL);
    status.tick().await;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            update = rx.recv() => {
                let Some(update) = update else {
                    warn!("All pollers stopped");
                    break;
                };

                let market_id = update.market_id.clone();
                process_update(&engine, &catalog, &sinks, update);

                if pending.remove(&market_id) && pending.is_empty() {
                    app_state.set_ready(true);
                    info!("Initial snapshot pass complete");
                }
            }
            _ = status.tick() => log_status(&engine.stats(), started.elapsed()),
        }
    }

    for poller in &pollers {
        poller.abort();
    }

    let stats = engine.stats();
    info!("========================================");
    info!("MONITOR STOPPED - FINAL SUMMARY");
    info!("========================================");
    info!("Uptime: {}s", started.elapsed().as_secs());
    info!("Order updates: {}", stats.updates);
    info!("Snapshot changes: {}", stats.changes);
    info!("Excluded orders: {}", stats.anomalies);
    info!("Event evaluations: {}", stats.checks);
    info!("Opportunities detected: {}", stats.opportunities);
    info!("========================================");

    Ok(())
}

/// Apply one order update and re-evaluate the market's event when its best odds changed.
fn process_update(
    engine: &ArbEngine,
    catalog: &MarketCatalog,
    sinks: &[Box<dyn ReportSink>],
    update: OrderUpdate,
) {
    let result = engine.apply_orders(&update.market_id, &update.orders);
    if !result.changed {
        return;
    }

    for sink in sinks {
        sink.snapshot_changed(&result.snapshot);
    }

    let Some(event) = catalog.event_for_market(&update.market_id) else {
        return;
    };

    let evaluation = engine.evaluate_event(event);
    for sink in sinks {
        sink.event_evaluated(event, &evaluation);
    }
}

fn log_status(stats: &EngineStats, uptime: Duration) {
    info!(
        uptime_s = uptime.as_secs(),
        markets = stats.markets,
        updates = stats.updates,
        changes = stats.changes,
        anomalies = stats.anomalies,
        checks = stats.checks,
        opportunities = stats.opportunities,
        "Monitor status"
    );
}
