//! Request metrics middleware
//!
//! Counts requests and records latency and status codes per endpoint. The
//! endpoint key is the matched route template, so `/v1/users/<uuid>/status`
//! is recorded once as `/v1/users/:id/status`. Requests that match no route
//! share the single [`UNMATCHED_ENDPOINT`] key.

use crate::state::AppState;
use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

/// Key for requests that matched no route
pub const UNMATCHED_ENDPOINT: &str = "<unmatched>";

/// Metrics tracking middleware
pub async fn metrics_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let endpoint = match request.extensions().get::<MatchedPath>() {
        Some(matched) => matched.as_str().to_string(),
        None => UNMATCHED_ENDPOINT.to_string(),
    };

    let response = next.run(request).await;

    let latency_us = start.elapsed().as_micros() as u64;
    state
        .record_request(endpoint, response.status().as_u16(), latency_us)
        .await;

    response
}
