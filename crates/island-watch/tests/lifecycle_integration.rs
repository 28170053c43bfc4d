//! Integration tests for the lifecycle subsystem against real processes.
//!
//! These tests drive `SessionLifecycleCoordinator` through a channel-backed
//! `RegistryHandle`, with a small in-test store draining the command channel,
//! and watch real `sleep` children through the OS process probe.
//!
//! Tests CAN use `.unwrap()` and `.expect()`.

#![cfg(unix)]

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

use island_core::{ExitTrigger, SessionId, SessionPhase, SessionSnapshot};
use island_watch::registry::{self, RegistryCommand};
use island_watch::{SessionLifecycleCoordinator, WatchConfig};
use tokio::sync::mpsc;
use tokio::time::timeout;

// ============================================================================
// Test Helpers
// ============================================================================

/// What the in-test store saw, in arrival order.
#[derive(Debug)]
enum Observed {
    Exited(island_core::ProcessExit),
    Resync(SessionId, PathBuf),
}

/// Spawns a store that answers listings with `sessions` and forwards
/// everything else to the returned receiver.
fn spawn_store(
    sessions: Vec<SessionSnapshot>,
) -> (registry::RegistryHandle, mpsc::UnboundedReceiver<Observed>) {
    let (handle, mut commands) = registry::channel(16);
    let (observed_tx, observed_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Some(command) = commands.recv().await {
            match command {
                RegistryCommand::ProcessExited { exit } => {
                    let _ = observed_tx.send(Observed::Exited(exit));
                }
                RegistryCommand::ListSessions { respond_to } => {
                    let _ = respond_to.send(sessions.clone());
                }
                RegistryCommand::RequestFileResync { session_id, cwd } => {
                    let _ = observed_tx.send(Observed::Resync(session_id, cwd));
                }
            }
        }
    });

    (handle, observed_rx)
}

fn spawn_sleeper() -> Child {
    Command::new("sleep")
        .arg("30")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn sleep")
}

fn kill_and_reap(child: &mut Child) {
    child.kill().expect("failed to kill child");
    child.wait().expect("failed to reap child");
}

fn coordinator_for(handle: registry::RegistryHandle, config: &WatchConfig) -> SessionLifecycleCoordinator {
    SessionLifecycleCoordinator::new(Arc::new(handle), config)
}

// ============================================================================
// Exit Detection
// ============================================================================

#[tokio::test]
async fn test_real_process_exit_reported_once() {
    let (handle, mut observed) = spawn_store(Vec::new());
    let lifecycle = coordinator_for(handle, &WatchConfig::default());

    let mut child = spawn_sleeper();
    let session = SessionId::new("real-exit");
    lifecycle.watch(child.id(), session.clone());
    assert!(lifecycle.watcher().is_watching(&session));

    kill_and_reap(&mut child);

    let first = timeout(Duration::from_secs(5), observed.recv())
        .await
        .expect("exit should be reported")
        .expect("store closed");
    match first {
        Observed::Exited(exit) => {
            assert_eq!(exit.session_id, session);
            assert_eq!(exit.pid, child.id());
            assert_eq!(exit.trigger, ExitTrigger::Notification);
        }
        other => panic!("unexpected store traffic: {other:?}"),
    }

    assert!(timeout(Duration::from_millis(300), observed.recv())
        .await
        .is_err());
    assert!(!lifecycle.watcher().is_watching(&session));
}

#[tokio::test]
async fn test_already_reaped_process_reported_immediately() {
    let (handle, mut observed) = spawn_store(Vec::new());
    let lifecycle = coordinator_for(handle, &WatchConfig::default());

    let mut child = spawn_sleeper();
    let pid = child.id();
    kill_and_reap(&mut child);

    lifecycle.watch(pid, SessionId::new("late"));
    assert!(!lifecycle.watcher().is_watching(&SessionId::new("late")));

    let Some(Observed::Exited(exit)) = timeout(Duration::from_secs(2), observed.recv())
        .await
        .expect("exit should be reported")
    else {
        panic!("expected an exit report");
    };
    assert_eq!(exit.pid, pid);
    assert_eq!(exit.trigger, ExitTrigger::AlreadyExited);

    assert!(timeout(Duration::from_millis(200), observed.recv())
        .await
        .is_err());
}

#[tokio::test]
async fn test_polling_detection_reports_exit() {
    let (handle, mut observed) = spawn_store(Vec::new());
    let config = WatchConfig {
        exit_detection: island_watch::ExitDetection::Polling,
        exit_poll_interval: Duration::from_millis(20),
        ..WatchConfig::default()
    };
    let lifecycle = coordinator_for(handle, &config);

    let mut child = spawn_sleeper();
    lifecycle.watch(child.id(), SessionId::new("polled"));
    kill_and_reap(&mut child);

    let exit = timeout(Duration::from_secs(5), observed.recv())
        .await
        .expect("exit should be reported");
    assert!(matches!(exit, Some(Observed::Exited(_))));
}

#[tokio::test]
async fn test_stopped_watch_does_not_report() {
    let (handle, mut observed) = spawn_store(Vec::new());
    let lifecycle = coordinator_for(handle, &WatchConfig::default());

    let mut child = spawn_sleeper();
    let session = SessionId::new("stopped");
    lifecycle.watch(child.id(), session.clone());
    assert!(lifecycle.stop(&session));

    kill_and_reap(&mut child);
    assert!(timeout(Duration::from_millis(300), observed.recv())
        .await
        .is_err());
}

// ============================================================================
// Periodic Refresh
// ============================================================================

#[tokio::test]
async fn test_refresh_resyncs_active_sessions_through_channel() {
    let (handle, mut observed) = spawn_store(vec![
        SessionSnapshot::new("busy", SessionPhase::Processing, "/work/busy"),
        SessionSnapshot::new("asking", SessionPhase::WaitingForApproval, "/work/asking"),
        SessionSnapshot::new("quiet", SessionPhase::Idle, "/work/quiet"),
    ]);
    let config = WatchConfig {
        refresh_interval: Duration::from_millis(50),
        ..WatchConfig::default()
    };
    let lifecycle = coordinator_for(handle, &config);
    assert!(lifecycle.start_all());

    let mut seen = Vec::new();
    while seen.len() < 2 {
        match timeout(Duration::from_secs(2), observed.recv()).await {
            Ok(Some(Observed::Resync(id, cwd))) => seen.push((id.to_string(), cwd)),
            other => panic!("expected a resync, got {other:?}"),
        }
    }
    assert_eq!(seen[0], ("busy".to_string(), PathBuf::from("/work/busy")));
    assert_eq!(seen[1], ("asking".to_string(), PathBuf::from("/work/asking")));

    lifecycle.shutdown();
}

// ============================================================================
// Shutdown
// ============================================================================

#[tokio::test]
async fn test_shutdown_silences_watches_and_refresh() {
    let (handle, mut observed) = spawn_store(vec![SessionSnapshot::new(
        "busy",
        SessionPhase::Processing,
        "/work/busy",
    )]);
    let config = WatchConfig {
        refresh_interval: Duration::from_millis(50),
        ..WatchConfig::default()
    };
    let lifecycle = coordinator_for(handle, &config);

    let mut child = spawn_sleeper();
    lifecycle.watch(child.id(), SessionId::new("watched"));
    lifecycle.start_all();
    lifecycle.shutdown();

    assert_eq!(lifecycle.watcher().watched_count(), 0);
    assert!(!lifecycle.refresher().is_running());

    kill_and_reap(&mut child);
    assert!(timeout(Duration::from_millis(300), observed.recv())
        .await
        .is_err());
}
