//! Error types for the monitor crate.

use std::path::PathBuf;

use airbeam_client::ClientError;

/// Errors surfaced by monitor operations.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// The operation named a device that is not in the configuration
    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    /// `start` was called while a poll loop from this monitor is still running
    #[error("Monitor is already running")]
    AlreadyRunning,

    /// The device could not be reached or returned an unreadable status
    #[error("Device error: {0}")]
    Client(#[from] ClientError),

    /// Invalid configuration provided
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors from loading or validating a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid JSON for the expected shape
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration parsed but failed validation
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Convenience type alias for Results using MonitorError.
pub type Result<T> = std::result::Result<T, MonitorError>;
