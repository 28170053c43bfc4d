//! Interface to the external session registry.
//!
//! The registry (the session store) owns all session state. The lifecycle
//! subsystem only talks to it through [`SessionRegistry`]:
//!
//! ```text
//! ┌──────────────────┐  ProcessExited        ┌──────────────────┐
//! │ProcessExitWatcher│──────────────────────▶│                  │
//! └──────────────────┘                       │  session store   │
//! ┌──────────────────┐  ListSessions         │  (host-owned     │
//! │ RefreshScheduler │──────────────────────▶│   actor)         │
//! │                  │  RequestFileResync    │                  │
//! └──────────────────┘──────────────────────▶└──────────────────┘
//! ```
//!
//! Hosts that run their store as an actor can use [`channel`] to get a
//! [`RegistryHandle`] (implements the trait) and the command receiver to
//! drain in their actor loop.
//!
//! # Panic-Free Guarantees
//!
//! All operations in this module follow the panic-free policy:
//! - No `.unwrap()` or `.expect()` in production code
//! - Channel operations handle closure gracefully

use std::path::Path;

use async_trait::async_trait;
use tokio::sync::mpsc;

use island_core::{ProcessExit, SessionId, SessionSnapshot};

mod commands;
mod handle;

pub use commands::{RegistryCommand, RegistryError};
pub use handle::RegistryHandle;

/// Operations the lifecycle subsystem needs from the session store.
#[async_trait]
pub trait SessionRegistry: Send + Sync + 'static {
    /// Marks the session ended because its process exited.
    async fn report_process_exited(&self, exit: ProcessExit) -> Result<(), RegistryError>;

    /// Returns every session the store knows about.
    async fn list_all_sessions(&self) -> Result<Vec<SessionSnapshot>, RegistryError>;

    /// Asks the store to re-read the session's transcript files.
    async fn request_file_resync(
        &self,
        session_id: &SessionId,
        cwd: &Path,
    ) -> Result<(), RegistryError>;
}

/// Creates a channel-backed registry client.
///
/// The returned receiver yields one [`RegistryCommand`] per trait call; the
/// host's store actor is expected to drain it.
pub fn channel(buffer: usize) -> (RegistryHandle, mpsc::Receiver<RegistryCommand>) {
    let (cmd_tx, cmd_rx) = mpsc::channel(buffer.max(1));
    (RegistryHandle::new(cmd_tx), cmd_rx)
}
