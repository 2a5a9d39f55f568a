use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

use db_introspection_backend::api::routes::create_router_with_state;
use db_introspection_backend::config::Config;
use db_introspection_backend::services::{IntrospectionService, MySqlConnector, SessionCache};
use db_introspection_backend::storage::SqliteStorage;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration first so logging.level can seed the filter
    let config = Config::from_env()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!("Starting server on {}", config.server_address());

    // Initialize SQLite storage
    let storage = Arc::new(SqliteStorage::new(&config.database.url).await.map_err(|e| {
        error!("Failed to initialize database: {}", e);
        e
    })?);

    // Session cache over the connection directory
    let cache = SessionCache::new(
        storage.clone(),
        Arc::new(MySqlConnector::new()),
        (&config.cache).into(),
    );
    let sweeper = cache.start_sweeper();
    let introspection = Arc::new(IntrospectionService::new(cache.clone()));

    // Create router with state
    let app: Router = create_router_with_state(storage, config.clone(), introspection);

    // Start server
    let addr: SocketAddr = config.server_address().parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.stop().await;
    cache.shutdown().await;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
