//! Petstore API - authentication and authorization server
//!
//! Provides HTTP endpoints for registration, login and logout, plus the
//! request pipeline that enforces token blacklisting and per-route roles.

pub mod audit;
pub mod auth;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

use anyhow::Context;
use auth::{auth_gate, blacklist_middleware, AuthService};
use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    Router,
};
use petstore_core::{
    AppConfig, CredentialStore, DatabaseConfig, MemoryCredentialStore, PgCredentialStore,
    StoreBackend,
};
use state::AppState;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Largest accepted request body
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Open the credential store selected by configuration
pub async fn connect_store(config: &DatabaseConfig) -> anyhow::Result<Arc<dyn CredentialStore>> {
    match config.backend {
        StoreBackend::Postgres => {
            let store = PgCredentialStore::new(&config.url, config.pool_size)
                .await
                .context("Failed to connect to the credential store")?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory credential store; data is lost on exit");
            Ok(Arc::new(MemoryCredentialStore::new()))
        }
    }
}

/// Build shared state from validated configuration and an open store
pub fn build_state(
    config: AppConfig,
    store: Arc<dyn CredentialStore>,
) -> anyhow::Result<Arc<AppState>> {
    config.validate().context("Invalid configuration")?;
    let auth = AuthService::from_config(Arc::clone(&store), &config.auth)
        .context("Invalid auth configuration")?;

    Ok(Arc::new(AppState::new(
        config,
        store,
        auth,
        routes::access_policy(),
    )))
}

/// Build the full router: routes, the per-route gate and global middleware
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    routes::api_routes()
        .route_layer(from_fn_with_state(Arc::clone(&state), auth_gate))
        .fallback(handlers::route_not_found)
        .layer(from_fn_with_state(Arc::clone(&state), blacklist_middleware))
        .layer(from_fn(middleware::hide_secrets_middleware))
        .layer(from_fn_with_state(
            Arc::clone(&state),
            middleware::metrics_middleware,
        ))
        .layer(from_fn(middleware::security_headers_middleware))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS for the configured origins; none configured means no cross-origin access
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return CorsLayer::new();
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Signing secret used by [`create_test_app`]
#[cfg(feature = "test-utils")]
pub const TEST_JWT_SECRET: &str = "petstore-test-secret";

/// Router and state backed by the in-memory store with cheap password hashing
#[cfg(feature = "test-utils")]
pub fn create_test_app() -> (Router, Arc<AppState>) {
    let mut config = AppConfig::default();
    config.database.backend = StoreBackend::Memory;
    config.auth.jwt_secret = Some(TEST_JWT_SECRET.to_string());

    let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
    let auth = AuthService::from_config(Arc::clone(&store), &config.auth)
        .expect("test auth configuration is valid")
        .with_password_config(auth::PasswordConfig::fast());

    let state = Arc::new(AppState::new(config, store, auth, routes::access_policy()));
    (create_router(Arc::clone(&state)), state)
}

/// Router over a fresh in-memory store, for integration tests
#[cfg(feature = "test-utils")]
pub fn create_router_for_testing() -> Router {
    create_test_app().0
}
