//! HTTP API route definitions.

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{health, metrics, odds, opportunities, ready, status, AppState};

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(health))
        .route("/ready", get(ready))
        // Status and data endpoints
        .route("/api/v1/status", get(status))
        .route("/api/v1/odds", get(odds))
        .route("/api/v1/opportunities", get(opportunities))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitrage::ArbEngine;
    use crate::market::MockOrderBuilder;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let engine = ArbEngine::builder().build().unwrap();
        AppState::new(Arc::new(engine), None)
    }

    async fn get_body(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or_default())
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let (status, body) = get_body(create_router(test_state()), "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn ready_endpoint_returns_503_when_not_ready() {
        let (status, _) = get_body(create_router(test_state()), "/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn ready_endpoint_returns_200_when_ready() {
        let state = test_state();
        state.set_ready(true);
        state.set_events(3);

        let (status, body) = get_body(create_router(state), "/ready").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["events"], 3);
    }

    #[tokio::test]
    async fn status_and_odds_reflect_engine() {
        let state = test_state();
        let orders = MockOrderBuilder::new("0xm").yes(2.5, 10).no(1.6, 10).build();
        state.engine.apply_orders("0xm", &orders);

        let (_, status) = get_body(create_router(state.clone()), "/api/v1/status").await;
        assert_eq!(status["stats"]["updates"], 1);
        assert_eq!(status["stats"]["markets"], 1);

        let (code, odds) = get_body(create_router(state), "/api/v1/odds").await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(odds[0]["market_id"], "0xm");
        assert_eq!(odds[0]["outcome_one"]["order_id"], "0xm-0");
    }

    #[tokio::test]
    async fn opportunities_start_empty() {
        let (status, body) = get_body(create_router(test_state()), "/api/v1/opportunities").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));
    }

    #[tokio::test]
    async fn metrics_without_recorder_is_not_found() {
        let response = create_router(test_state())
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
