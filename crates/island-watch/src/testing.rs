//! Test doubles shared by the unit tests in this crate.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use island_core::{ProcessExit, SessionId, SessionSnapshot};

use crate::process::{ExitSubscription, ProcessProbe};
use crate::registry::{RegistryError, SessionRegistry};

// ============================================================================
// Recording Registry
// ============================================================================

/// Registry that serves a fixed session list and records every call.
pub struct RecordingRegistry {
    sessions: Mutex<Vec<SessionSnapshot>>,
    exits_tx: mpsc::UnboundedSender<ProcessExit>,
    exits_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<ProcessExit>>,
    resyncs: Mutex<Vec<(SessionId, PathBuf)>>,
    failing_resyncs: Mutex<HashSet<SessionId>>,
    fail_listing: Mutex<bool>,
}

impl RecordingRegistry {
    pub fn new() -> Self {
        Self::with_sessions(Vec::new())
    }

    pub fn with_sessions(sessions: Vec<SessionSnapshot>) -> Self {
        let (exits_tx, exits_rx) = mpsc::unbounded_channel();
        Self {
            sessions: Mutex::new(sessions),
            exits_tx,
            exits_rx: tokio::sync::Mutex::new(exits_rx),
            resyncs: Mutex::new(Vec::new()),
            failing_resyncs: Mutex::new(HashSet::new()),
            fail_listing: Mutex::new(false),
        }
    }

    pub fn set_sessions(&self, sessions: Vec<SessionSnapshot>) {
        *self.sessions.lock().unwrap() = sessions;
    }

    pub fn fail_resync_for(&self, session_id: &str) {
        self.failing_resyncs
            .lock()
            .unwrap()
            .insert(SessionId::new(session_id));
    }

    pub fn fail_listing(&self, fail: bool) {
        *self.fail_listing.lock().unwrap() = fail;
    }

    pub fn resyncs(&self) -> Vec<(SessionId, PathBuf)> {
        self.resyncs.lock().unwrap().clone()
    }

    /// Waits for the next exit report.
    pub async fn next_exit(&self, within: Duration) -> Option<ProcessExit> {
        let mut rx = self.exits_rx.lock().await;
        tokio::time::timeout(within, rx.recv()).await.ok().flatten()
    }
}

#[async_trait]
impl SessionRegistry for RecordingRegistry {
    async fn report_process_exited(&self, exit: ProcessExit) -> Result<(), RegistryError> {
        self.exits_tx
            .send(exit)
            .map_err(|_| RegistryError::ChannelClosed)
    }

    async fn list_all_sessions(&self) -> Result<Vec<SessionSnapshot>, RegistryError> {
        if *self.fail_listing.lock().unwrap() {
            return Err(RegistryError::Rejected("listing disabled".to_string()));
        }
        Ok(self.sessions.lock().unwrap().clone())
    }

    async fn request_file_resync(
        &self,
        session_id: &SessionId,
        cwd: &Path,
    ) -> Result<(), RegistryError> {
        if self.failing_resyncs.lock().unwrap().contains(session_id) {
            return Err(RegistryError::Rejected(format!("no transcript for {session_id}")));
        }
        self.resyncs
            .lock()
            .unwrap()
            .push((session_id.clone(), cwd.to_path_buf()));
        Ok(())
    }
}

// ============================================================================
// Scripted Probe
// ============================================================================

/// Increments the shared counter when dropped before the exit fired.
struct CancelGuard {
    cancelled: Arc<AtomicUsize>,
    fired: bool,
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        if !self.fired {
            self.cancelled.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Probe whose process table and exit notifications are driven by the test.
#[derive(Default)]
pub struct ScriptedProbe {
    dead: Mutex<HashSet<u32>>,
    unsubscribable: Mutex<HashSet<u32>>,
    triggers: Mutex<HashMap<u32, Vec<oneshot::Sender<()>>>>,
    subscribed: AtomicUsize,
    cancelled: Arc<AtomicUsize>,
}

impl ScriptedProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Marks the pid dead for liveness checks without firing notifications.
    pub fn mark_dead(&self, pid: u32) {
        self.dead.lock().unwrap().insert(pid);
    }

    /// Makes `subscribe_exit` report the pid as already gone.
    pub fn refuse_subscription(&self, pid: u32) {
        self.unsubscribable.lock().unwrap().insert(pid);
    }

    /// Fires every armed notification for `pid`.
    pub fn fire_exit(&self, pid: u32) {
        self.mark_dead(pid);
        let senders = self
            .triggers
            .lock()
            .unwrap()
            .remove(&pid)
            .unwrap_or_default();
        for tx in senders {
            let _ = tx.send(());
        }
    }

    pub fn subscriptions(&self) -> usize {
        self.subscribed.load(Ordering::SeqCst)
    }

    /// Subscriptions dropped before their exit fired.
    pub fn cancellations(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl ProcessProbe for ScriptedProbe {
    fn is_running(&self, pid: u32) -> bool {
        !self.dead.lock().unwrap().contains(&pid)
    }

    fn subscribe_exit(&self, pid: u32) -> ExitSubscription {
        if self.unsubscribable.lock().unwrap().contains(&pid) {
            return ExitSubscription::AlreadyExited;
        }
        self.subscribed.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = oneshot::channel();
        self.triggers.lock().unwrap().entry(pid).or_default().push(tx);

        let guard = CancelGuard {
            cancelled: Arc::clone(&self.cancelled),
            fired: false,
        };
        ExitSubscription::Armed(Box::pin(async move {
            // Bind the whole guard so the future owns it, not just `fired`.
            let mut guard = guard;
            if rx.await.is_ok() {
                guard.fired = true;
            }
        }))
    }
}

/// Polls `condition` until it holds or `within` elapses.
pub async fn wait_until<F>(within: Duration, condition: F) -> bool
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
