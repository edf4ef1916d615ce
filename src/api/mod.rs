// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP surface: `/metrics` for Prometheus scrapes and `/health` for probes.

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod health;
pub mod metrics;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(metrics::metrics))
        .route("/health", get(health::health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsSink;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn state() -> AppState {
        AppState::new(Arc::new(MetricsSink::new().unwrap()), 3)
    }

    async fn get_body(app: Router, uri: &str) -> (StatusCode, Option<String>, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn metrics_endpoint_serves_text_format() {
        let state = state();
        state.metrics.record_cycle(Duration::from_millis(10), 0);

        let (status, content_type, body) = get_body(router(state), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some(metrics::PROMETHEUS_CONTENT_TYPE));
        assert!(body.contains("evm_balance_cycles_total 1"));
    }

    #[tokio::test]
    async fn health_reports_targets_and_cycles() {
        let state = state();
        state.metrics.record_cycle(Duration::from_millis(10), 0);
        state.metrics.record_cycle(Duration::from_millis(10), 0);

        let (status, _, body) = get_body(router(state), "/health").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["targets"], 3);
        assert_eq!(json["cycles_completed"], 2);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let (status, _, _) = get_body(router(state()), "/balances").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
