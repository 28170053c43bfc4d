//! Periodic file resync for sessions that are mid-turn.
//!
//! Sessions that are processing or waiting for approval can change state
//! without emitting hook events, so their transcript files are resynced on a
//! fixed interval. Idle and ended sessions are left alone.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Registry failures are logged and the loop keeps ticking

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::registry::SessionRegistry;

/// Shortest tick the scheduler will run at. Zero would spin on the registry.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(1);

struct RefreshTask {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

/// Drives [`refresh_active_sessions`] on a fixed interval.
///
/// At most one loop runs at a time. `start` and `stop` are idempotent.
pub struct PeriodicRefreshScheduler {
    registry: Arc<dyn SessionRegistry>,
    interval: Duration,
    task: Mutex<Option<RefreshTask>>,
}

impl PeriodicRefreshScheduler {
    /// `interval` is clamped to [`MIN_REFRESH_INTERVAL`].
    pub fn new(registry: Arc<dyn SessionRegistry>, interval: Duration) -> Self {
        Self {
            registry,
            interval: interval.max(MIN_REFRESH_INTERVAL),
            task: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Starts the refresh loop. Returns `false` if it was already running
    /// or no tokio runtime is available.
    pub fn start(&self) -> bool {
        let mut task = self.lock_task();
        if task.as_ref().is_some_and(|t| !t.join.is_finished()) {
            debug!("Refresh loop already running");
            return false;
        }

        let Ok(runtime) = Handle::try_current() else {
            warn!("Cannot start refresh loop outside a tokio runtime");
            return false;
        };

        let cancel = CancellationToken::new();
        let join = runtime.spawn(run_refresh_loop(
            Arc::clone(&self.registry),
            self.interval,
            cancel.clone(),
        ));
        *task = Some(RefreshTask { cancel, join });

        info!(interval = ?self.interval, "Periodic refresh started");
        true
    }

    /// Stops the refresh loop. No tick starts after this returns.
    pub fn stop(&self) {
        if let Some(task) = self.lock_task().take() {
            task.cancel.cancel();
            info!("Periodic refresh stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock_task()
            .as_ref()
            .is_some_and(|t| !t.cancel.is_cancelled() && !t.join.is_finished())
    }

    fn lock_task(&self) -> MutexGuard<'_, Option<RefreshTask>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for PeriodicRefreshScheduler {
    fn drop(&mut self) {
        if let Some(task) = self.lock_task().take() {
            task.cancel.cancel();
        }
    }
}

async fn run_refresh_loop(
    registry: Arc<dyn SessionRegistry>,
    interval: Duration,
    cancel: CancellationToken,
) {
    loop {
        if cancel.is_cancelled() {
            break;
        }

        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            _ = tokio::time::sleep(interval) => {}
        }

        // Woken by the timer in the same poll that stop() ran
        if cancel.is_cancelled() {
            break;
        }

        let refreshed = refresh_active_sessions(registry.as_ref(), &cancel).await;
        if refreshed > 0 {
            debug!(refreshed, "Periodic refresh tick");
        }
    }
    debug!("Refresh loop exited");
}

/// Requests a file resync for every session whose phase needs one.
///
/// Returns the number of resyncs the registry accepted. Stops early if
/// `cancel` fires.
pub async fn refresh_active_sessions(
    registry: &dyn SessionRegistry,
    cancel: &CancellationToken,
) -> usize {
    let sessions = match registry.list_all_sessions().await {
        Ok(sessions) => sessions,
        Err(e) => {
            warn!(error = %e, "Failed to list sessions for refresh");
            return 0;
        }
    };

    let mut refreshed = 0;
    for session in sessions
        .iter()
        .filter(|s| s.phase.needs_periodic_refresh())
    {
        if cancel.is_cancelled() {
            break;
        }
        match registry
            .request_file_resync(&session.session_id, &session.cwd)
            .await
        {
            Ok(()) => refreshed += 1,
            Err(e) => warn!(
                session_id = %session.session_id.short(),
                error = %e,
                "File resync failed"
            ),
        }
    }
    refreshed
}
