//! island core - shared domain types for session tracking and notch geometry
//!
//! This crate provides the types shared between the lifecycle subsystem
//! (`island-watch`) and whatever presentation layer draws the overlay:
//! - `session` - session identifiers, phases, snapshots and exit reports
//! - `geometry` - rectangles, notch/pill geometry and hit testing
//! - `display` - raw display metrics and notch detection
//!
//! Everything here is synchronous and side-effect free.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod display;
pub mod error;
pub mod geometry;
pub mod session;

// Re-exports for convenience
pub use display::{select_notch_display, DisplayMetrics};
pub use error::{DomainError, DomainResult};
pub use geometry::{NotchGeometry, PanelState, Point, Rect, Size};
pub use session::{ExitTrigger, ProcessExit, SessionId, SessionPhase, SessionSnapshot};
