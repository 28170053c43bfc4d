//! Session identifiers, phases and the records exchanged with the session store.

use crate::{DomainError, DomainResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

// ============================================================================
// Type-Safe Identifiers
// ============================================================================

/// Unique identifier for a coding-agent session.
///
/// Assigned externally (usually a UUID string such as
/// "8e11bfb5-7dc2-432b-9206-928fa5c35731"); the core never generates one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Creates a new SessionId from a string.
    ///
    /// Note: no format validation happens here. The session store hands
    /// these out, so we trust its format.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the underlying string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a shortened display form (first 8 characters).
    ///
    /// Used in log lines where the full UUID is noise.
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Session Phase
// ============================================================================

/// Current activity state of a session, as owned by the session store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Waiting for nothing in particular
    #[default]
    Idle,

    /// The agent is working on a prompt
    Processing,

    /// A tool call is blocked on user permission
    WaitingForApproval,

    /// The agent finished and wants the next prompt
    WaitingForInput,

    /// Context compaction in progress
    Compacting,

    /// The session is over (process exited or SessionEnd received)
    Ended,
}

impl SessionPhase {
    /// Returns true if the periodic refresh should resync this session's files.
    ///
    /// Only phases where the transcript is expected to change without a
    /// hook event arriving qualify.
    pub fn needs_periodic_refresh(&self) -> bool {
        matches!(self, Self::Processing | Self::WaitingForApproval)
    }

    /// Returns true if the agent is doing work or blocked on the user.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Processing | Self::WaitingForApproval | Self::Compacting
        )
    }

    /// Returns true for the terminal phase.
    pub fn is_ended(&self) -> bool {
        matches!(self, Self::Ended)
    }

    /// Returns the snake_case wire name of this phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Processing => "processing",
            Self::WaitingForApproval => "waiting_for_approval",
            Self::WaitingForInput => "waiting_for_input",
            Self::Compacting => "compacting",
            Self::Ended => "ended",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionPhase {
    type Err = DomainError;

    fn from_str(s: &str) -> DomainResult<Self> {
        match s {
            "idle" => Ok(Self::Idle),
            "processing" => Ok(Self::Processing),
            "waiting_for_approval" => Ok(Self::WaitingForApproval),
            "waiting_for_input" => Ok(Self::WaitingForInput),
            "compacting" => Ok(Self::Compacting),
            "ended" => Ok(Self::Ended),
            other => Err(DomainError::InvalidFieldValue {
                field: "phase".to_string(),
                value: other.to_string(),
                expected: "idle|processing|waiting_for_approval|waiting_for_input|compacting|ended"
                    .to_string(),
            }),
        }
    }
}

// ============================================================================
// Snapshots and Reports
// ============================================================================

/// Read-only view of a session handed out by the session store.
///
/// The lifecycle subsystem only reads `phase` and `cwd` and never keeps a
/// snapshot beyond a single refresh tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub phase: SessionPhase,
    pub cwd: PathBuf,
}

impl SessionSnapshot {
    pub fn new(session_id: impl Into<SessionId>, phase: SessionPhase, cwd: impl Into<PathBuf>) -> Self {
        Self {
            session_id: session_id.into(),
            phase,
            cwd: cwd.into(),
        }
    }
}

/// How an exit was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitTrigger {
    /// The kernel (or the polling fallback) signalled the exit.
    Notification,

    /// The process was already gone when the watch was armed.
    AlreadyExited,
}

impl fmt::Display for ExitTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Notification => write!(f, "exit notification"),
            Self::AlreadyExited => write!(f, "already exited at watch time"),
        }
    }
}

/// "Session ended" report delivered to the session store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessExit {
    pub session_id: SessionId,
    pub pid: u32,
    pub detected_at: DateTime<Utc>,
    pub trigger: ExitTrigger,
}

impl ProcessExit {
    /// Creates a report stamped with the current time.
    pub fn now(session_id: SessionId, pid: u32, trigger: ExitTrigger) -> Self {
        Self {
            session_id,
            pid,
            detected_at: Utc::now(),
            trigger,
        }
    }
}
