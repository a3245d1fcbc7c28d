// SPDX-License-Identifier: MIT

//! Vyllo API Server
//!
//! Connects creator accounts on YouTube, TikTok, and Instagram, syncs
//! their content into a shared cache, and serves public portfolio pages.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vyllo_api::{
    config::Config,
    db::{FirestoreStore, Store},
    platforms::PlatformRegistry,
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Vyllo API");

    // Initialize Firestore. Boot with an unconfigured handle when the
    // connection fails so health checks still respond.
    let store: Arc<dyn Store> = match FirestoreStore::new(&config.gcp_project_id).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::warn!(error = %e, "Firestore unavailable, database operations will fail");
            Arc::new(FirestoreStore::new_unconfigured())
        }
    };

    // Initialize platform clients
    let platforms = PlatformRegistry::from_config(&config);
    tracing::info!("Platform clients initialized");

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), store, platforms));

    // Build router
    let app = vyllo_api::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vyllo_api=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
