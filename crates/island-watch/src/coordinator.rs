//! Single entry point the presentation layer talks to.
//!
//! Composes a [`ProcessExitWatcher`] and a [`PeriodicRefreshScheduler`]
//! over one shared registry.

use std::sync::Arc;

use tracing::info;

use island_core::SessionId;

use crate::config::WatchConfig;
use crate::process::{KernelProbe, ProcessProbe};
use crate::refresh::PeriodicRefreshScheduler;
use crate::registry::SessionRegistry;
use crate::watcher::ProcessExitWatcher;

pub struct SessionLifecycleCoordinator {
    watcher: ProcessExitWatcher,
    refresher: PeriodicRefreshScheduler,
}

impl SessionLifecycleCoordinator {
    /// Builds a coordinator backed by the OS process probe.
    pub fn new(registry: Arc<dyn SessionRegistry>, config: &WatchConfig) -> Self {
        Self::with_probe(registry, Arc::new(KernelProbe::from_config(config)), config)
    }

    pub fn with_probe(
        registry: Arc<dyn SessionRegistry>,
        probe: Arc<dyn ProcessProbe>,
        config: &WatchConfig,
    ) -> Self {
        Self {
            watcher: ProcessExitWatcher::new(probe, Arc::clone(&registry)),
            refresher: PeriodicRefreshScheduler::new(registry, config.refresh_interval),
        }
    }

    /// Watches `pid` for exit on behalf of `session_id`.
    pub fn watch(&self, pid: u32, session_id: SessionId) {
        self.watcher.watch(pid, session_id);
    }

    /// Stops watching a session. Returns whether a watch was removed.
    pub fn stop(&self, session_id: &SessionId) -> bool {
        self.watcher.stop(session_id)
    }

    /// Starts periodic refresh. Returns `false` if it was already running.
    pub fn start_all(&self) -> bool {
        self.refresher.start()
    }

    /// Stops periodic refresh and every process watch.
    pub fn shutdown(&self) {
        info!("Shutting down session lifecycle");
        self.refresher.stop();
        self.watcher.stop_all();
    }

    pub fn watcher(&self) -> &ProcessExitWatcher {
        &self.watcher
    }

    pub fn refresher(&self) -> &PeriodicRefreshScheduler {
        &self.refresher
    }
}

impl Drop for SessionLifecycleCoordinator {
    // Watch tasks keep the watcher alive; cancel them with the coordinator.
    fn drop(&mut self) {
        self.watcher.stop_all();
    }
}
