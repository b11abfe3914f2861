//! # Siteline API Server
//!
//! HTTP front for the Siteline authentication core: registration, login,
//! token refresh, OAuth callbacks and account administration.
//!
//! ## Usage
//!
//! ```bash
//! JWT_SECRET=$(openssl rand -hex 32) cargo run -p siteline-api
//! ```
//!
//! Without `DATABASE_URL` the server keeps users in memory.

use siteline_api::{
    app::{build_router, AppState, StoreBackend},
    config::{Config, LogFormat},
};
use siteline_shared::auth::clock::SystemClock;
use siteline_shared::db::{
    migrations::run_migrations,
    pool::{close_pool, create_pool, DatabaseConfig},
};
use siteline_shared::store::PgUserStore;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "siteline_api=debug,siteline_shared=debug,tower_http=debug";

fn init_tracing(format: LogFormat) {
    let registry = tracing_subscriber::registry().with(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
    );

    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    tracing::info!(
        "Siteline API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let store = match &config.database {
        Some(db) => {
            let pool = create_pool(DatabaseConfig {
                url: db.url.clone(),
                max_connections: db.max_connections,
                ..Default::default()
            })
            .await?;
            run_migrations(&pool).await?;
            StoreBackend::Postgres(PgUserStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; users are kept in memory and lost on restart");
            StoreBackend::memory()
        }
    };

    let bind_address = config.bind_address();
    let state = AppState::build(config, store.clone(), Arc::new(SystemClock))?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!(store = store.name(), "Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let StoreBackend::Postgres(store) = store {
        close_pool(store.pool().clone()).await;
    }

    tracing::info!("Server stopped");
    Ok(())
}
