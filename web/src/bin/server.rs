//! Wereda Queue Server
//!
//! Main server process for the walk-in queue management system.
//!
//! This binary:
//! - Connects to `PostgreSQL` and applies schema migrations
//! - Assembles the queue engine over the store
//! - Serves the kiosk/counter/display HTTP API
//!
//! # Usage
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/wereda_queue cargo run --bin server
//! ```

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wereda_core::QueueEngine;
use wereda_core::environment::SystemClock;
use wereda_postgres::PostgresQueueStore;
use wereda_web::{AppState, Config, build_router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,wereda_web=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Wereda Queue Server...");

    let config = Config::from_env();
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        expiry_hours = config.queue.ticket_expiry_hours,
        "Configuration loaded"
    );

    let store = PostgresQueueStore::connect(
        &config.database.url,
        config.database.max_connections,
    )
    .await?;
    store.migrate().await?;
    tracing::info!("Store ready");

    let engine = Arc::new(QueueEngine::new(
        Arc::new(store),
        Arc::new(SystemClock),
        config.engine_config(),
    ));
    let app = build_router(AppState::new(engine));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Wereda Queue Server is running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to install ctrl-c handler");
    }
}
