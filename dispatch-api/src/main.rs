//! DISPATCH API Server Entry Point
//!
//! Bootstraps configuration, opens the configured store backend, and starts
//! the Axum HTTP server with the retention sweeper running alongside.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use dispatch_api::{
    create_api_router, ApiError, ApiResult, AppConfig, DeliveryPipeline, HttpDelivery,
    RecordingDelivery, RetentionSweeper, RetentionSweeperConfig, StoreBackend,
};
use dispatch_storage::{KeyedStore, LmdbStore, MemoryStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracing();

    let config = AppConfig::from_env();

    let store: Arc<dyn KeyedStore> = match config.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; lease state will not survive restarts");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Lmdb => Arc::new(
            LmdbStore::new(&config.lmdb_path, config.lmdb_max_size_mb).map_err(|e| {
                ApiError::internal_error(format!("Failed to open LMDB store: {}", e))
            })?,
        ),
    };

    let delivery: Arc<dyn DeliveryPipeline> = match &config.delivery_url {
        Some(url) => Arc::new(
            HttpDelivery::new(url, config.delivery_timeout).map_err(|e| {
                ApiError::internal_error(format!("Failed to build delivery client: {}", e))
            })?,
        ),
        None => {
            tracing::warn!(
                "DISPATCH_DELIVERY_URL not set; notifications will be recorded, not sent"
            );
            Arc::new(RecordingDelivery::new())
        }
    };

    let sweeper = RetentionSweeper::start(
        Arc::clone(&store),
        RetentionSweeperConfig {
            sweep_interval: config.sweep_interval,
        },
    );

    let app: Router = create_api_router(store, delivery, &config);

    let addr = resolve_bind_addr(&config)?;
    tracing::info!(%addr, "Starting DISPATCH API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    sweeper.stop().await;
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("dispatch_api=debug,tower_http=debug,info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn resolve_bind_addr(config: &AppConfig) -> ApiResult<SocketAddr> {
    let addr = format!("{}:{}", config.bind_host, config.port);
    addr.parse::<SocketAddr>()
        .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
}
