//! Periodic trash retention.
//!
//! The sweeper runs in its own tokio task and purges expired trash while the
//! vault is unlocked. Ticks that find the vault locked are skipped; the
//! sweeper never unlocks anything itself.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::manager::VaultManager;
use hushvault_common::Error;

/// Handle to a running retention task.
pub struct RetentionSweeper {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl RetentionSweeper {
    /// Start sweeping every `every`, with the first sweep one interval from
    /// now.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(manager: Arc<VaultManager>, every: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            info!(interval_secs = every.as_secs(), "Retention sweeper started");

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => sweep(&manager).await,
                }
            }

            info!("Retention sweeper stopped");
        });

        Self { shutdown_tx, task }
    }

    /// Start with the interval from the manager's settings.
    pub fn spawn_with_settings(manager: Arc<VaultManager>) -> Self {
        let every = manager.settings().purge_interval;
        Self::spawn(manager, every)
    }

    /// Stop the task and wait for it to finish.
    ///
    /// A sweep already underway completes first.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            error!("Retention sweeper task failed: {}", e);
        }
    }
}

async fn sweep(manager: &VaultManager) {
    if !manager.is_unlocked().await {
        debug!("Vault locked, skipping retention sweep");
        return;
    }

    match manager.purge_expired_trash().await {
        Ok(purged) => debug!(purged, "Retention sweep complete"),
        Err(Error::SessionNotActive | Error::SessionInvalidated) => {
            debug!("Session ended during retention sweep");
        }
        Err(e) => error!("Retention sweep failed: {}", e),
    }
}
