//! Health check handlers

use crate::state::{AppState, EndpointMetrics};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub name: String,
}

/// Liveness check
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
    })
}

/// Readiness response
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub credential_store: bool,
}

/// Readiness check: the credential store must answer
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let credential_store = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Credential store readiness check failed");
            false
        }
    };

    let ready = state.is_ready() && credential_store;
    let response = ReadinessResponse {
        ready,
        checks: ReadinessChecks { credential_store },
    };

    if ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// JSON metrics response
#[derive(Serialize)]
pub struct MetricsResponse {
    pub uptime_seconds: u64,
    pub total_requests: u64,
    pub requests_per_second: f64,
    pub endpoints: BTreeMap<String, EndpointSummary>,
}

#[derive(Serialize)]
pub struct EndpointSummary {
    pub count: u64,
    pub status_counts: BTreeMap<u16, u64>,
    pub avg_latency_us: u64,
    pub max_latency_us: u64,
}

impl From<EndpointMetrics> for EndpointSummary {
    fn from(m: EndpointMetrics) -> Self {
        Self {
            count: m.count,
            avg_latency_us: m.avg_latency_us(),
            max_latency_us: m.max_latency_us,
            status_counts: m.status_counts,
        }
    }
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let uptime = state.uptime_secs();
    let total_requests = state.get_request_count();
    let rps = if uptime > 0 {
        total_requests as f64 / uptime as f64
    } else {
        0.0
    };

    let endpoints = state
        .metrics_snapshot()
        .await
        .into_iter()
        .map(|(endpoint, m)| (endpoint, EndpointSummary::from(m)))
        .collect();

    Json(MetricsResponse {
        uptime_seconds: uptime,
        total_requests,
        requests_per_second: rps,
        endpoints,
    })
}
