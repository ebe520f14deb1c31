//! Retention Sweeper Background Task
//!
//! Periodically reclaims records whose retention horizon has passed.
//! Physical reclamation is eventual by design: the resolver and lease
//! manager never rely on a record being gone, only on logical expiry
//! checks against `record_expiry_at`. This task just keeps the store from
//! growing without bound.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dispatch_storage::KeyedStore;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for the retention sweeper.
#[derive(Debug, Clone)]
pub struct RetentionSweeperConfig {
    /// How often to sweep (default: 1 hour).
    pub sweep_interval: Duration,
}

impl Default for RetentionSweeperConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(3600),
        }
    }
}

// ============================================================================
// SWEEPER
// ============================================================================

/// Handle to the running sweeper task.
pub struct RetentionSweeper {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
    swept_total: Arc<AtomicU64>,
}

impl RetentionSweeper {
    /// Spawn the sweeper. The first sweep runs immediately, then on the
    /// configured cadence.
    pub fn start(store: Arc<dyn KeyedStore>, config: RetentionSweeperConfig) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let swept_total = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&swept_total);

        let handle = tokio::spawn(async move {
            let mut ticker = interval(config.sweep_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let now = chrono::Utc::now().timestamp();
                        match store.sweep_expired(now).await {
                            Ok(0) => {}
                            Ok(removed) => {
                                counter.fetch_add(removed, Ordering::Relaxed);
                                tracing::info!(removed, "Retention sweep reclaimed expired records");
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "Retention sweep failed");
                            }
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        tracing::debug!("Retention sweeper shutting down");
                        break;
                    }
                }
            }
        });

        Self {
            shutdown_tx,
            handle,
            swept_total,
        }
    }

    /// Total records reclaimed since start.
    pub fn swept_total(&self) -> u64 {
        self.swept_total.load(Ordering::Relaxed)
    }

    /// Signal shutdown and wait for the task to finish.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.handle.await;
    }
}

// =============================================================================
// TESTS
// =============================================================================
