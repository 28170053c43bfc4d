//! Registry commands and errors.
//!
//! This module defines the message types sent to a channel-backed session store:
//! - `RegistryCommand`: Commands sent to the store actor
//! - `RegistryError`: Errors that can occur during registry operations

use std::path::PathBuf;

use island_core::{ProcessExit, SessionId, SessionSnapshot};
use thiserror::Error;
use tokio::sync::oneshot;

// ============================================================================
// Registry Commands
// ============================================================================

/// Commands sent to the session store actor.
///
/// Only queries carry a oneshot channel for the response; lifecycle
/// notifications are fire-and-forget.
#[derive(Debug)]
pub enum RegistryCommand {
    /// A watched process exited. The store should end the session.
    ProcessExited {
        /// Who exited, and how we noticed
        exit: ProcessExit,
    },

    /// List every session.
    ListSessions {
        /// Channel to send the results
        respond_to: oneshot::Sender<Vec<SessionSnapshot>>,
    },

    /// Re-read a session's transcript files from disk.
    RequestFileResync {
        /// ID of the session to resync
        session_id: SessionId,
        /// Working directory the transcript is derived from
        cwd: PathBuf,
    },
}

// ============================================================================
// Registry Errors
// ============================================================================

/// Errors that can occur during registry operations.
///
/// None of these are fatal to the lifecycle subsystem: callers log and move on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The store's command channel or response channel was closed.
    ///
    /// This typically indicates the store was shut down.
    #[error("registry channel closed")]
    ChannelClosed,

    /// The store refused the request.
    #[error("registry rejected request: {0}")]
    Rejected(String),
}
