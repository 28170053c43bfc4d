//! island - session lifecycle tracking and notch overlay geometry
//!
//! Re-exports the two workspace crates under one name:
//! - [`domain`] - domain types, display metrics and notch geometry
//! - [`watch`] - process exit watching, periodic refresh, config and logging
//!
//! ```no_run
//! use std::sync::Arc;
//! use island::watch::{registry, SessionLifecycleCoordinator, WatchConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = WatchConfig::load(None)?;
//! let (handle, mut commands) = registry::channel(config.registry_buffer);
//! let lifecycle = SessionLifecycleCoordinator::new(Arc::new(handle), &config);
//!
//! lifecycle.start_all();
//! lifecycle.watch(4242, "session-1".into());
//!
//! while let Some(command) = commands.recv().await {
//!     // apply to the session store
//!     # let _ = command;
//! }
//! # Ok(())
//! # }
//! ```

pub use island_core as domain;
pub use island_watch as watch;

pub use island_core::{
    DisplayMetrics, NotchGeometry, PanelState, ProcessExit, SessionId, SessionPhase,
    SessionSnapshot,
};
pub use island_watch::{SessionLifecycleCoordinator, SessionRegistry, WatchConfig};
