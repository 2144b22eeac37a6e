//! Application state management

use crate::auth::{AccessPolicy, AuthService};
use petstore_core::{AppConfig, CredentialStore};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Request statistics for one endpoint
#[derive(Debug, Clone, Default, Serialize)]
pub struct EndpointMetrics {
    pub count: u64,
    pub status_counts: BTreeMap<u16, u64>,
    pub total_latency_us: u64,
    pub max_latency_us: u64,
}

impl EndpointMetrics {
    pub fn avg_latency_us(&self) -> u64 {
        if self.count == 0 {
            0
        } else {
            self.total_latency_us / self.count
        }
    }
}

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Credential store shared by the service and readiness checks
    pub store: Arc<dyn CredentialStore>,
    /// Registration, login, logout and identity resolution
    pub auth: AuthService,
    /// Route access table consulted by the gate
    pub policy: AccessPolicy,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
    /// Ready status
    pub is_ready: AtomicBool,
    /// Per-endpoint request metrics
    pub metrics: RwLock<HashMap<String, EndpointMetrics>>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        config: AppConfig,
        store: Arc<dyn CredentialStore>,
        auth: AuthService,
        policy: AccessPolicy,
    ) -> Self {
        Self {
            config,
            store,
            auth,
            policy,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            is_ready: AtomicBool::new(true),
            metrics: RwLock::new(HashMap::new()),
        }
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Check if service is ready
    pub fn is_ready(&self) -> bool {
        self.is_ready.load(Ordering::SeqCst)
    }

    /// Set ready status
    pub fn set_ready(&self, ready: bool) {
        self.is_ready.store(ready, Ordering::SeqCst);
    }

    /// Record one completed request
    pub async fn record_request(&self, endpoint: String, status: u16, latency_us: u64) {
        self.increment_requests();

        let mut metrics = self.metrics.write().await;
        let entry = metrics.entry(endpoint).or_default();
        entry.count += 1;
        *entry.status_counts.entry(status).or_insert(0) += 1;
        entry.total_latency_us += latency_us;
        entry.max_latency_us = entry.max_latency_us.max(latency_us);
    }

    /// Copy of the per-endpoint metrics, sorted by endpoint
    pub async fn metrics_snapshot(&self) -> BTreeMap<String, EndpointMetrics> {
        self.metrics
            .read()
            .await
            .iter()
            .map(|(endpoint, m)| (endpoint.clone(), m.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::JwtConfig;
    use petstore_core::MemoryCredentialStore;

    fn test_state() -> AppState {
        let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
        let auth = AuthService::new(
            Arc::clone(&store),
            JwtConfig::new("state-test-secret", 7200).unwrap(),
        );
        AppState::new(AppConfig::default(), store, auth, AccessPolicy::new())
    }

    #[tokio::test]
    async fn test_record_request() {
        let state = test_state();
        state.record_request("/v1/auth/login".to_string(), 200, 100).await;
        state.record_request("/v1/auth/login".to_string(), 401, 300).await;

        let snapshot = state.metrics_snapshot().await;
        let login = &snapshot["/v1/auth/login"];
        assert_eq!(login.count, 2);
        assert_eq!(login.status_counts[&401], 1);
        assert_eq!(login.avg_latency_us(), 200);
        assert_eq!(login.max_latency_us, 300);
        assert_eq!(state.get_request_count(), 2);
    }

    #[test]
    fn test_ready_flag() {
        let state = test_state();
        assert!(state.is_ready());
        state.set_ready(false);
        assert!(!state.is_ready());
    }
}
