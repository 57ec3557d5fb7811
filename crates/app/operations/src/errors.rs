//! Error types for the operations crate.

use thiserror::Error;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O error when loading config.
    #[error("failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },

    /// YAML parsing error.
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },

    /// Validation failed with one or more errors.
    #[error("config validation failed:\n{}", .0.join("\n"))]
    ValidationFailed(Vec<String>),
}

/// Logging setup errors.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// A global subscriber could not be installed.
    #[error("failed to install log subscriber: {0}")]
    Init(String),

    /// The level filter could not be swapped.
    #[error("failed to reload log filter: {0}")]
    Reload(String),
}

/// Shutdown-related errors.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// One or more components did not stop within the timeout.
    #[error("components did not shut down within {timeout:?}: {}", .components.join(", "))]
    Timeout {
        components: Vec<String>,
        timeout: std::time::Duration,
    },
}
