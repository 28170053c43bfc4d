//! Per-session process exit watching.
//!
//! Each watched session gets one exit subscription (see [`crate::process`])
//! awaited on its own task. When the subscription fires, the session's
//! handle is removed and a single [`ProcessExit`] is reported to the
//! registry.
//!
//! # Exactly-once reporting
//!
//! The watch map is the single point of truth. Every exit path removes the
//! session's handle under the lock before reporting, and only reports if the
//! handle it removed is the one that was armed for that exit (matched by
//! generation). A duplicate kernel event, the post-install liveness check,
//! or a stale task from a superseded watch therefore finds nothing to remove
//! and reports nothing.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - A poisoned map lock is recovered, not propagated
//! - Registry failures are logged and dropped

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use island_core::{ExitTrigger, ProcessExit, SessionId};

use crate::process::{ExitSubscription, ProcessProbe};
use crate::registry::SessionRegistry;

/// Subscription record for one watched session.
#[derive(Debug)]
struct WatchHandle {
    pid: u32,
    generation: u64,
    cancel: CancellationToken,
}

struct WatcherInner {
    watches: Mutex<HashMap<SessionId, WatchHandle>>,
    next_generation: AtomicU64,
    probe: Arc<dyn ProcessProbe>,
    registry: Arc<dyn SessionRegistry>,
}

/// Watches session processes and reports each exit exactly once.
///
/// Cheap to clone; clones share the same watch map.
#[derive(Clone)]
pub struct ProcessExitWatcher {
    inner: Arc<WatcherInner>,
}

impl ProcessExitWatcher {
    pub fn new(probe: Arc<dyn ProcessProbe>, registry: Arc<dyn SessionRegistry>) -> Self {
        Self {
            inner: Arc::new(WatcherInner {
                watches: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(1),
                probe,
                registry,
            }),
        }
    }

    /// Starts watching `pid` on behalf of `session_id`.
    ///
    /// Replaces any existing watch for the session. If the process is
    /// already gone by the time the subscription is armed, the exit is
    /// handled immediately.
    ///
    /// Must be called from within a tokio runtime; outside one the call is
    /// logged and ignored.
    pub fn watch(&self, pid: u32, session_id: SessionId) {
        let Ok(runtime) = Handle::try_current() else {
            warn!(
                pid,
                session_id = %session_id.short(),
                "Cannot watch process outside a tokio runtime"
            );
            return;
        };

        self.stop(&session_id);

        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let subscription = self.inner.probe.subscribe_exit(pid);

        let displaced = self.inner.lock_watches().insert(
            session_id.clone(),
            WatchHandle {
                pid,
                generation,
                cancel: cancel.clone(),
            },
        );
        // A concurrent watch() for the same session may have slipped in
        // between stop() and insert().
        if let Some(old) = displaced {
            old.cancel.cancel();
        }

        debug!(pid, session_id = %session_id.short(), generation, "Watching process");

        match subscription {
            ExitSubscription::Armed(exited) => {
                let inner = Arc::clone(&self.inner);
                let task_session = session_id.clone();
                runtime.spawn(async move {
                    tokio::select! {
                        biased;

                        _ = cancel.cancelled() => {
                            debug!(pid, session_id = %task_session.short(), "Exit watch cancelled");
                        }

                        _ = exited => {
                            inner.handle_exit(&task_session, pid, generation, ExitTrigger::Notification);
                        }
                    }
                });
            }
            ExitSubscription::AlreadyExited => {
                self.inner
                    .handle_exit(&session_id, pid, generation, ExitTrigger::AlreadyExited);
                return;
            }
        }

        // The process may have died between pid assignment and arming.
        if !self.inner.probe.is_running(pid) {
            self.inner
                .handle_exit(&session_id, pid, generation, ExitTrigger::AlreadyExited);
        }
    }

    /// Stops watching a session. Returns whether a watch was removed.
    ///
    /// Safe to call for unwatched sessions and any number of times.
    pub fn stop(&self, session_id: &SessionId) -> bool {
        let removed = self.inner.lock_watches().remove(session_id);
        match removed {
            Some(handle) => {
                handle.cancel.cancel();
                debug!(
                    pid = handle.pid,
                    session_id = %session_id.short(),
                    "Stopped watching process"
                );
                true
            }
            None => false,
        }
    }

    /// Cancels every watch.
    pub fn stop_all(&self) {
        let drained: Vec<(SessionId, WatchHandle)> = self.inner.lock_watches().drain().collect();
        for (_, handle) in &drained {
            handle.cancel.cancel();
        }
        if !drained.is_empty() {
            info!(count = drained.len(), "Stopped all process watches");
        }
    }

    /// Whether a watch is armed for the session.
    pub fn is_watching(&self, session_id: &SessionId) -> bool {
        self.inner.lock_watches().contains_key(session_id)
    }

    /// Number of armed watches.
    pub fn watched_count(&self) -> usize {
        self.inner.lock_watches().len()
    }
}

impl WatcherInner {
    fn lock_watches(&self) -> MutexGuard<'_, HashMap<SessionId, WatchHandle>> {
        self.watches.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Exit path shared by the notification task and the liveness re-check.
    fn handle_exit(&self, session_id: &SessionId, pid: u32, generation: u64, trigger: ExitTrigger) {
        let removed = {
            let mut watches = self.lock_watches();
            match watches.get(session_id) {
                Some(handle) if handle.generation == generation => watches.remove(session_id),
                _ => None,
            }
        };

        let Some(handle) = removed else {
            debug!(
                pid,
                session_id = %session_id.short(),
                %trigger,
                "Exit already handled or watch superseded"
            );
            return;
        };
        handle.cancel.cancel();

        info!(
            pid,
            session_id = %session_id.short(),
            %trigger,
            "Process exited, ending session"
        );

        let registry = Arc::clone(&self.registry);
        let exit = ProcessExit::now(session_id.clone(), pid, trigger);
        tokio::spawn(async move {
            let session_id = exit.session_id.clone();
            if let Err(e) = registry.report_process_exited(exit).await {
                warn!(
                    session_id = %session_id.short(),
                    error = %e,
                    "Failed to report process exit"
                );
            }
        });
    }
}
