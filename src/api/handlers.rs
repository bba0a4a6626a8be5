//! HTTP API handlers.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use time::OffsetDateTime;

use crate::arbitrage::{ArbEngine, ArbitrageOpportunity, EngineStats, EventEvaluation};
use crate::market::Event;
use crate::orderbook::BestOdds;
use crate::report::ReportSink;

/// Opportunities kept for `/api/v1/opportunities`.
pub const MAX_RECENT_OPPORTUNITIES: usize = 100;

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Whether the first snapshot pass completed.
    pub ready: Arc<AtomicBool>,
    /// Engine whose snapshots and counters are served.
    pub engine: Arc<ArbEngine>,
    /// Number of events being monitored.
    pub events: Arc<AtomicUsize>,
    /// Most recent opportunities, newest first.
    pub opportunities: Arc<Mutex<VecDeque<ArbitrageOpportunity>>>,
    /// Prometheus recorder handle, when installed.
    pub metrics: Option<PrometheusHandle>,
    /// Process start time.
    pub started_at: OffsetDateTime,
}

impl AppState {
    /// Create new app state.
    pub fn new(engine: Arc<ArbEngine>, metrics: Option<PrometheusHandle>) -> Self {
        Self {
            ready: Arc::new(AtomicBool::new(false)),
            engine,
            events: Arc::new(AtomicUsize::new(0)),
            opportunities: Arc::new(Mutex::new(VecDeque::with_capacity(
                MAX_RECENT_OPPORTUNITIES,
            ))),
            metrics,
            started_at: OffsetDateTime::now_utc(),
        }
    }

    /// Set ready state.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Check if ready.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Record how many events are monitored.
    pub fn set_events(&self, count: usize) {
        self.events.store(count, Ordering::Relaxed);
    }

    /// Store an opportunity, evicting the oldest beyond the limit.
    pub fn push_opportunity(&self, opportunity: ArbitrageOpportunity) {
        let mut recent = self
            .opportunities
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        recent.push_front(opportunity);
        recent.truncate(MAX_RECENT_OPPORTUNITIES);
    }

    /// Copy of the recent opportunities, newest first.
    pub fn recent_opportunities(&self) -> Vec<ArbitrageOpportunity> {
        self.opportunities
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

impl ReportSink for AppState {
    fn snapshot_changed(&self, _snapshot: &BestOdds) {
        // snapshots are read from the engine on request
    }

    fn event_evaluated(&self, _event: &Event, evaluation: &EventEvaluation) {
        for opportunity in &evaluation.opportunities {
            self.push_opportunity(opportunity.clone());
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Whether service is ready.
    pub ready: bool,
    /// Events being monitored.
    pub events: usize,
}

/// Status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Service status.
    pub status: &'static str,
    /// Seconds since start.
    pub uptime_seconds: i64,
    /// Events being monitored.
    pub events: usize,
    /// Engine counters.
    pub stats: EngineStats,
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Readiness check handler - returns 200 if ready, 503 otherwise.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let is_ready = state.is_ready();
    let response = ReadyResponse {
        ready: is_ready,
        events: state.events.load(Ordering::Relaxed),
    };

    if is_ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Status handler - returns engine statistics.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let status = if state.is_ready() { "running" } else { "starting" };

    Json(StatusResponse {
        status,
        uptime_seconds: (OffsetDateTime::now_utc() - state.started_at).whole_seconds(),
        events: state.events.load(Ordering::Relaxed),
        stats: state.engine.stats(),
    })
}

/// Latest best-odds snapshot of every market, by market id.
pub async fn odds(State(state): State<AppState>) -> impl IntoResponse {
    let mut snapshots = state.engine.snapshots();
    snapshots.sort_by(|a, b| a.market_id.cmp(&b.market_id));
    Json(snapshots)
}

/// Most recent opportunities, newest first.
pub async fn opportunities(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.recent_opportunities())
}

/// Prometheus text exposition.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::NOT_FOUND,
            "metrics recorder not installed".to_string(),
        ),
    }
}
