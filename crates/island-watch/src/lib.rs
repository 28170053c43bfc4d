//! island watch - session lifecycle subsystem
//!
//! This crate keeps the session store honest about sessions whose agent
//! process has gone away, and keeps mid-turn sessions fresh:
//! - `process` - OS liveness probe and kernel exit subscriptions
//! - `watcher` - per-session exit watching with exactly-once reporting
//! - `refresh` - periodic file resync for processing/approval sessions
//! - `coordinator` - the facade composing the two
//! - `registry` - client interface to the external session store
//! - `config` / `logging` - ambient setup for embedding hosts
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │               SessionLifecycleCoordinator                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐   │
//! │  │ProcessExitWatcher│    │  PeriodicRefreshScheduler   │   │
//! │  │ (pidfd / kqueue) │    │   (one cancellable loop)    │   │
//! │  └────────┬────────┘     └──────────────┬──────────────┘   │
//! │           │ exits                       │ resyncs          │
//! │           ▼                             ▼                   │
//! │  ┌─────────────────────────────────────────────────────┐   │
//! │  │        SessionRegistry (RegistryHandle → store)     │   │
//! │  └─────────────────────────────────────────────────────┘   │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod config;
pub mod coordinator;
pub mod logging;
pub mod process;
pub mod refresh;
pub mod registry;
pub mod watcher;

#[cfg(test)]
mod testing;

pub use config::{ConfigError, ExitDetection, WatchConfig};
pub use coordinator::SessionLifecycleCoordinator;
pub use logging::{init_logging, LoggingError};
pub use process::{is_process_running, ExitSubscription, KernelProbe, ProcessProbe};
pub use refresh::{refresh_active_sessions, PeriodicRefreshScheduler};
pub use registry::{RegistryCommand, RegistryError, RegistryHandle, SessionRegistry};
pub use watcher::ProcessExitWatcher;
