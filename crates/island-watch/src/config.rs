//! Lifecycle configuration: TOML file + environment overrides.
//!
//! ```toml
//! [lifecycle]
//! refresh_interval_secs = 5
//! exit_poll_interval_ms = 1000
//! registry_buffer = 100
//! exit_detection = "kernel"   # or "polling"
//! ```
//!
//! Every key is optional. `ISLAND_REFRESH_INTERVAL_SECS` and
//! `ISLAND_EXIT_POLL_INTERVAL_MS` override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

/// How often active sessions get their files resynced.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

/// Sampling interval for the polling exit fallback.
pub const DEFAULT_EXIT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Command channel capacity for [`crate::registry::channel`].
pub const DEFAULT_REGISTRY_BUFFER: usize = 100;

pub const REFRESH_INTERVAL_ENV: &str = "ISLAND_REFRESH_INTERVAL_SECS";
pub const EXIT_POLL_INTERVAL_ENV: &str = "ISLAND_EXIT_POLL_INTERVAL_MS";

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    InvalidInterval { field: &'static str },
}

// ============================================================================
// File Format
// ============================================================================

/// How process exits are detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitDetection {
    /// pidfd (Linux) or kqueue (macOS), polling where unsupported
    #[default]
    Kernel,
    /// Always sample the process table
    Polling,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    lifecycle: LifecycleSection,
}

/// `[lifecycle]` section of the config TOML.
#[derive(Debug, Clone, Deserialize)]
struct LifecycleSection {
    #[serde(default = "default_refresh_interval_secs")]
    refresh_interval_secs: u64,
    #[serde(default = "default_exit_poll_interval_ms")]
    exit_poll_interval_ms: u64,
    #[serde(default = "default_registry_buffer")]
    registry_buffer: usize,
    #[serde(default)]
    exit_detection: ExitDetection,
}

impl Default for LifecycleSection {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval_secs(),
            exit_poll_interval_ms: default_exit_poll_interval_ms(),
            registry_buffer: default_registry_buffer(),
            exit_detection: ExitDetection::default(),
        }
    }
}

fn default_refresh_interval_secs() -> u64 {
    DEFAULT_REFRESH_INTERVAL.as_secs()
}
fn default_exit_poll_interval_ms() -> u64 {
    u64::try_from(DEFAULT_EXIT_POLL_INTERVAL.as_millis()).unwrap_or(u64::MAX)
}
fn default_registry_buffer() -> usize {
    DEFAULT_REGISTRY_BUFFER
}

// ============================================================================
// Resolved Config
// ============================================================================

/// Resolved lifecycle configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    pub refresh_interval: Duration,
    pub exit_poll_interval: Duration,
    pub registry_buffer: usize,
    pub exit_detection: ExitDetection,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self::from_section(LifecycleSection::default())
    }
}

impl WatchConfig {
    /// `<config_dir>/island/config.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("island").join("config.toml"))
    }

    /// Loads config from `path` (or the default path), then applies
    /// environment overrides.
    ///
    /// A missing file is not an error; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(Path::to_path_buf).or_else(Self::default_path);

        let base = match path {
            Some(path) if path.exists() => {
                info!(path = %path.display(), "Loading config file");
                let content = std::fs::read_to_string(&path).map_err(|source| {
                    ConfigError::Read {
                        path: path.clone(),
                        source,
                    }
                })?;
                Self::parse(&content, &path)?
            }
            Some(path) => {
                debug!(path = %path.display(), "No config file, using defaults");
                Self::default()
            }
            None => Self::default(),
        };

        base.with_overrides(|var| std::env::var(var).ok())
    }

    /// Parses TOML content. `origin` is only used in error messages.
    pub fn parse(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        Self::from_section(file.lifecycle).validated()
    }

    /// Applies environment-style overrides from `lookup`.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(REFRESH_INTERVAL_ENV) {
            let secs = parse_env(REFRESH_INTERVAL_ENV, &value)?;
            self.refresh_interval = Duration::from_secs(secs);
        }
        if let Some(value) = lookup(EXIT_POLL_INTERVAL_ENV) {
            let millis = parse_env(EXIT_POLL_INTERVAL_ENV, &value)?;
            self.exit_poll_interval = Duration::from_millis(millis);
        }
        self.validated()
    }

    fn from_section(section: LifecycleSection) -> Self {
        Self {
            refresh_interval: Duration::from_secs(section.refresh_interval_secs),
            exit_poll_interval: Duration::from_millis(section.exit_poll_interval_ms),
            registry_buffer: section.registry_buffer,
            exit_detection: section.exit_detection,
        }
    }

    fn validated(self) -> Result<Self, ConfigError> {
        if self.refresh_interval.is_zero() {
            return Err(ConfigError::InvalidInterval {
                field: "refresh_interval",
            });
        }
        if self.exit_poll_interval.is_zero() {
            return Err(ConfigError::InvalidInterval {
                field: "exit_poll_interval",
            });
        }
        Ok(self)
    }
}

fn parse_env(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var,
        value: value.to_string(),
    })
}
