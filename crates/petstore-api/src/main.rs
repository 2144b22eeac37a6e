//! Petstore API Server
//!
//! Serves registration, login and logout, and gates every other route
//! on a verified, non-blacklisted token and the caller's roles.

use anyhow::Context;
use petstore_api::{build_state, connect_store, create_router, state::AppState};
use petstore_core::config::{AppConfig, LoggingConfig};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,petstore_api={level},petstore_core={level},audit=info,tower_http={level}",
            level = logging.level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);

    if logging.json_format {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

fn load_config() -> anyhow::Result<AppConfig> {
    let config = match std::env::var("PETSTORE_CONFIG") {
        Ok(path) => AppConfig::from_file(&path)?.with_env_override()?,
        Err(_) => AppConfig::from_env()?,
    };
    Ok(config)
}

/// Wait for Ctrl-C, then report not-ready while in-flight requests drain
async fn shutdown_signal(state: Arc<AppState>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    state.set_ready(false);
    tracing::info!("Shutdown signal received; draining requests");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config().context("Failed to load configuration")?;
    init_logging(&config.logging);

    tracing::debug!(
        backend = ?config.database.backend,
        token_expiration_secs = config.auth.token_expiration_secs,
        allow_manager_signup = config.auth.allow_manager_signup,
        "Configuration loaded"
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let store = connect_store(&config.database).await?;
    let state = build_state(config, store)?;
    let app = create_router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Petstore API server starting on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    Ok(())
}
