//! REST API Routes Module
//!
//! This module contains all REST API route handlers:
//! - Lead notification boundary (lease-managed sends)
//! - Token resolver for "text customer" links
//! - Admin lease inspection
//! - Health check endpoints (Kubernetes-compatible)
//! - CORS support for the browser-embedded chat widget

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use dispatch_storage::KeyedStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::delivery::DeliveryPipeline;

pub mod admin;
pub mod health;
pub mod lead;
pub mod token;

// Re-export route creation functions for convenience
pub use admin::create_router as admin_router;
pub use health::create_router as health_router;
pub use lead::create_router as lead_router;
pub use token::create_router as token_router;

// ============================================================================
// CORS
// ============================================================================

/// Build the CORS layer from configured origins. The widget runs inside
/// customer sites, so the public endpoints must answer cross-origin
/// requests; empty origins means allow all (dev mode).
fn build_cors_layer(config: &AppConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(86400));

    if config.cors_origins.is_empty() {
        // Development mode: allow all origins
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any).allow_headers(Any)
    } else {
        // Production mode: only allow configured origins
        tracing::info!(
            "CORS: Production mode - allowing origins: {:?}",
            config.cors_origins
        );
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

// ============================================================================
// API ROUTER
// ============================================================================

/// Create the full API router.
pub fn create_api_router(
    store: Arc<dyn KeyedStore>,
    delivery: Arc<dyn DeliveryPipeline>,
    config: &AppConfig,
) -> Router {
    Router::new()
        .nest(
            "/api/v1/leads",
            lead::create_router(Arc::clone(&store), delivery, config.lease),
        )
        .nest("/api/v1/tokens", token::create_router(Arc::clone(&store)))
        .nest(
            "/api/v1/admin",
            admin::create_router(Arc::clone(&store), config.admin_token.clone()),
        )
        .nest("/health", health::create_router(store))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(config))
}
