//! Periodic release of abandoned story locks.
//!
//! An editor that crashes or loses its connection never releases its lock.
//! The sweep clears every lock whose last refresh is older than the lock
//! timeout so the story becomes editable again even if nobody tries to
//! acquire it.

use std::time::Duration;

use storyflam_core::locking::LockManager;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// How long [`LockSweeper::stop`] waits for the loop to exit.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Run the sweep loop until `cancel` fires.
///
/// The first sweep happens immediately. A failed sweep is logged and retried
/// on the next tick.
pub async fn run(locks: LockManager, interval: Duration, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = interval.as_secs(),
        timeout_secs = locks.policy().timeout.num_seconds(),
        "Lock sweep job started"
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Lock sweep job stopping");
                break;
            }
            _ = ticker.tick() => {
                match locks.cleanup_stale().await {
                    Ok(0) => tracing::debug!("Lock sweep: no stale locks"),
                    Ok(cleared) => tracing::info!(cleared, "Lock sweep: cleared stale locks"),
                    Err(e) => tracing::error!(error = %e, "Lock sweep failed"),
                }
            }
        }
    }
}

/// Handle to a running sweep task.
///
/// Dropping the handle without calling [`stop`](Self::stop) leaves the task
/// running until the runtime shuts down.
#[derive(Debug)]
pub struct LockSweeper {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl LockSweeper {
    /// Spawn the sweep loop on the current runtime.
    pub fn start(locks: LockManager, interval: Duration) -> Self {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(locks, interval, cancel.clone()));
        Self { cancel, handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Cancel the loop and wait for it to finish. Safe to call after the task
    /// has already exited.
    pub async fn stop(self) {
        self.cancel.cancel();
        match tokio::time::timeout(STOP_TIMEOUT, self.handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "Lock sweep task panicked"),
            Err(_) => tracing::warn!("Lock sweep task did not stop in time"),
        }
    }
}
