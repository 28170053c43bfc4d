//! Tracing subscriber setup for hosts embedding the lifecycle subsystem.
//!
//! Respects `RUST_LOG`; falls back to info level for the island crates.
//!
//! ```bash
//! RUST_LOG=island_watch=debug my-host-app
//! ```

use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

/// Default directives added on top of `RUST_LOG`.
const DEFAULT_DIRECTIVES: [&str; 2] = ["island_watch=info", "island_core=info"];

/// Errors raised while installing the global subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log directive: {0}")]
    Directive(#[from] ParseError),

    #[error("global subscriber already installed: {0}")]
    AlreadyInitialized(String),
}

/// Installs a `fmt` subscriber with an env filter as the global default.
///
/// Returns an error instead of panicking if one is already installed.
pub fn init_logging() -> Result<(), LoggingError> {
    let mut filter = EnvFilter::from_default_env();
    for directive in DEFAULT_DIRECTIVES {
        filter = filter.add_directive(directive.parse()?);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_parse() {
        for directive in DEFAULT_DIRECTIVES {
            assert!(directive.parse::<tracing_subscriber::filter::Directive>().is_ok());
        }
    }

    #[test]
    fn test_second_init_is_an_error() {
        // The first call may already fail if another test installed a subscriber.
        let _ = init_logging();
        assert!(matches!(
            init_logging(),
            Err(LoggingError::AlreadyInitialized(_))
        ));
    }
}
