//! Background Expiration Sweeper
//!
//! A periodic task that evicts expired entries independent of read traffic.
//!
//! `get` only reclaims memory for services that are actually queried again;
//! an entry nobody reads after it expires would otherwise sit in memory for
//! the daemon's whole lifetime. The sweeper is a pure backstop: the
//! guarantee that an expired secret is never returned comes from `get`'s
//! own deadline check, not from sweep timing.

use crate::store::SecretStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

/// Configuration for the sweeper.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Interval between full sweeps (default: 60s)
    pub interval: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
        }
    }
}

/// A handle to the running sweeper.
///
/// Dropping the handle stops the background task.
#[derive(Debug)]
pub struct Sweeper {
    shutdown_tx: watch::Sender<bool>,
}

impl Sweeper {
    /// Starts the sweeper as a background task.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use credcache::store::{SecretStore, Sweeper, SweeperConfig};
    /// use std::sync::Arc;
    ///
    /// let store = Arc::new(SecretStore::new());
    /// let sweeper = Sweeper::start(Arc::clone(&store), SweeperConfig::default());
    ///
    /// // runs until stopped or dropped
    /// sweeper.stop();
    /// ```
    pub fn start(store: Arc<SecretStore>, config: SweeperConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(sweeper_loop(store, config, shutdown_rx));

        info!("background expiration sweeper started");

        Self { shutdown_tx }
    }

    /// Stops the sweeper.
    ///
    /// Called automatically when the handle is dropped.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
        info!("background expiration sweeper stopped");
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The main sweeper loop.
async fn sweeper_loop(
    store: Arc<SecretStore>,
    config: SweeperConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(config.interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("expiration sweeper received shutdown signal");
                    return;
                }
            }
        }

        let evicted = store.sweep(None);
        if evicted > 0 {
            debug!(
                evicted = evicted,
                remaining = store.len(),
                "expired secrets evicted"
            );
        }
    }
}
