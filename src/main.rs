//! Catalog Server - local library catalog
//!
//! Serves the catalog over HTTP, backed by an in-memory or PostgreSQL store.

use std::{net::SocketAddr, sync::Arc};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use catalog_server::{
    api,
    config::{AppConfig, StoreBackend},
    repository::{memory::MemoryStore, postgres::PgStore, EntityStore, Repository},
    services::Services,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("catalog_server={},tower_http=debug", config.logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Catalog Server v{}", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn EntityStore> = match config.store.backend {
        StoreBackend::Memory => {
            tracing::info!("Using in-memory store");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Postgres => {
            let store = PgStore::connect(&config.store).await?;
            tracing::info!("Connected to database, migrations completed");
            Arc::new(store)
        }
    };

    // Create repository and services
    let repository = Repository::new(store);
    let services = Services::new(repository.clone(), &config.catalog);

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    // Create application state
    let state = AppState {
        services: Arc::new(services),
    };

    let app = api::router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    repository.close().await;
    tracing::info!("Store closed, bye");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown requested");
}
