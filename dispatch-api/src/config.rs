//! API Configuration Module
//!
//! Configuration is loaded from environment variables with sensible defaults
//! for development. All lease timing knobs are plain numeric settings so the
//! core never reads the environment itself.

use std::time::Duration;

use dispatch_core::LeaseSettings;

// ============================================================================
// STORE BACKEND SELECTION
// ============================================================================

/// Which durable keyed store implementation to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// In-memory store. No durability; development and tests only.
    Memory,
    /// LMDB-backed store for single-node durable deployments.
    Lmdb,
}

impl StoreBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "memory" => Some(StoreBackend::Memory),
            "lmdb" => Some(StoreBackend::Lmdb),
            _ => None,
        }
    }
}

// ============================================================================
// APP CONFIGURATION
// ============================================================================

/// Top-level configuration for the DISPATCH API server.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Bind host (default `0.0.0.0`).
    pub bind_host: String,

    /// Bind port (default 3000; `PORT` wins over `DISPATCH_API_PORT`).
    pub port: u16,

    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode); the widget runs in
    /// arbitrary customer sites during development.
    pub cors_origins: Vec<String>,

    /// Static bearer credential for admin endpoints. When unset, admin
    /// endpoints reject every request.
    pub admin_token: Option<String>,

    /// Store backend selection.
    pub store_backend: StoreBackend,

    /// LMDB directory (only used with the lmdb backend).
    pub lmdb_path: String,

    /// LMDB map size in megabytes.
    pub lmdb_max_size_mb: usize,

    /// Lease protocol timing settings.
    pub lease: LeaseSettings,

    /// Delivery pipeline endpoint. When unset, notifications are recorded
    /// instead of sent (dev mode).
    pub delivery_url: Option<String>,

    /// Bounded timeout for each delivery call.
    pub delivery_timeout: Duration,

    /// Cadence of the retention sweeper.
    pub sweep_interval: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 3000,
            cors_origins: Vec::new(), // Empty = allow all
            admin_token: None,
            store_backend: StoreBackend::Memory,
            lmdb_path: "./data/dispatch".to_string(),
            lmdb_max_size_mb: 256,
            lease: LeaseSettings::default(),
            delivery_url: None,
            delivery_timeout: Duration::from_secs(30),
            sweep_interval: Duration::from_secs(3600),
        }
    }
}

impl AppConfig {
    /// Create AppConfig from environment variables.
    ///
    /// Environment variables:
    /// - `DISPATCH_API_BIND`: Bind host (default: 0.0.0.0)
    /// - `PORT` / `DISPATCH_API_PORT`: Bind port (default: 3000)
    /// - `DISPATCH_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `DISPATCH_ADMIN_TOKEN`: Static bearer credential for admin endpoints
    /// - `DISPATCH_STORE`: "memory" or "lmdb" (default: memory)
    /// - `DISPATCH_LMDB_PATH`: LMDB directory (default: ./data/dispatch)
    /// - `DISPATCH_LMDB_MAX_SIZE_MB`: LMDB map size (default: 256)
    /// - `DISPATCH_LEASE_DURATION_SECS`: Lease window (default: 120)
    /// - `DISPATCH_ERROR_COOLDOWN_SECS`: Post-failure cooldown (default: 300)
    /// - `DISPATCH_RECORD_RETENTION_SECS`: Record retention (default: 2592000)
    /// - `DISPATCH_TOKEN_TTL_SECS`: Link token validity (default: 604800)
    /// - `DISPATCH_DELIVERY_URL`: Delivery pipeline endpoint
    /// - `DISPATCH_DELIVERY_TIMEOUT_MS`: Delivery call timeout (default: 30000)
    /// - `DISPATCH_SWEEP_INTERVAL_SECS`: Retention sweep cadence (default: 3600)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind_host =
            std::env::var("DISPATCH_API_BIND").unwrap_or(defaults.bind_host);

        let port = std::env::var("PORT")
            .ok()
            .or_else(|| std::env::var("DISPATCH_API_PORT").ok())
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port);

        let cors_origins = std::env::var("DISPATCH_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let admin_token = std::env::var("DISPATCH_ADMIN_TOKEN")
            .ok()
            .filter(|s| !s.is_empty());

        let store_backend = std::env::var("DISPATCH_STORE")
            .ok()
            .and_then(|s| StoreBackend::parse(&s))
            .unwrap_or(defaults.store_backend);

        let lmdb_path = std::env::var("DISPATCH_LMDB_PATH").unwrap_or(defaults.lmdb_path);

        let lmdb_max_size_mb = std::env::var("DISPATCH_LMDB_MAX_SIZE_MB")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.lmdb_max_size_mb);

        let lease = LeaseSettings {
            lease_duration_secs: env_i64("DISPATCH_LEASE_DURATION_SECS")
                .unwrap_or(defaults.lease.lease_duration_secs),
            error_cooldown_secs: env_i64("DISPATCH_ERROR_COOLDOWN_SECS")
                .unwrap_or(defaults.lease.error_cooldown_secs),
            record_retention_secs: env_i64("DISPATCH_RECORD_RETENTION_SECS")
                .unwrap_or(defaults.lease.record_retention_secs),
            token_ttl_secs: env_i64("DISPATCH_TOKEN_TTL_SECS")
                .unwrap_or(defaults.lease.token_ttl_secs),
        };

        let delivery_url = std::env::var("DISPATCH_DELIVERY_URL")
            .ok()
            .filter(|s| !s.is_empty());

        let delivery_timeout = std::env::var("DISPATCH_DELIVERY_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.delivery_timeout);

        let sweep_interval = std::env::var("DISPATCH_SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.sweep_interval);

        Self {
            bind_host,
            port,
            cors_origins,
            admin_token,
            store_backend,
            lmdb_path,
            lmdb_max_size_mb,
            lease,
            delivery_url,
            delivery_timeout,
            sweep_interval,
        }
    }

    /// Check if running in production mode (strict CORS).
    pub fn is_production(&self) -> bool {
        !self.cors_origins.is_empty()
    }
}

fn env_i64(key: &str) -> Option<i64> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}
