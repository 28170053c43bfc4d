//! Channel client for a session store actor.
//!
//! The `RegistryHandle` provides a cheap-to-clone [`SessionRegistry`]
//! implementation that forwards every call as a [`RegistryCommand`].
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Channel errors are mapped to `RegistryError::ChannelClosed`

use std::path::Path;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use island_core::{ProcessExit, SessionId, SessionSnapshot};

use super::commands::{RegistryCommand, RegistryError};
use super::SessionRegistry;

// ============================================================================
// Registry Handle
// ============================================================================

/// Handle for talking to a session store actor.
///
/// This is a cheap-to-clone handle that can be shared across tasks.
///
/// # Usage
///
/// ```ignore
/// let (handle, mut commands) = island_watch::registry::channel(100);
///
/// // Store side
/// tokio::spawn(async move {
///     while let Some(cmd) = commands.recv().await {
///         // apply to the store
///     }
/// });
///
/// // Lifecycle side
/// let coordinator = SessionLifecycleCoordinator::new(Arc::new(handle), config);
/// ```
#[derive(Clone, Debug)]
pub struct RegistryHandle {
    /// Command sender to the store actor
    sender: mpsc::Sender<RegistryCommand>,
}

impl RegistryHandle {
    /// Create a new registry handle.
    pub fn new(sender: mpsc::Sender<RegistryCommand>) -> Self {
        Self { sender }
    }

    /// Check if the store is still receiving.
    ///
    /// Returns `true` if the command channel is still open.
    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }

    async fn send(&self, cmd: RegistryCommand) -> Result<(), RegistryError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RegistryError::ChannelClosed)
    }
}

#[async_trait]
impl SessionRegistry for RegistryHandle {
    async fn report_process_exited(&self, exit: ProcessExit) -> Result<(), RegistryError> {
        self.send(RegistryCommand::ProcessExited { exit }).await
    }

    async fn list_all_sessions(&self) -> Result<Vec<SessionSnapshot>, RegistryError> {
        let (tx, rx) = oneshot::channel();

        self.send(RegistryCommand::ListSessions { respond_to: tx })
            .await?;

        rx.await.map_err(|_| RegistryError::ChannelClosed)
    }

    async fn request_file_resync(
        &self,
        session_id: &SessionId,
        cwd: &Path,
    ) -> Result<(), RegistryError> {
        self.send(RegistryCommand::RequestFileResync {
            session_id: session_id.clone(),
            cwd: cwd.to_path_buf(),
        })
        .await
    }
}
