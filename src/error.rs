//! Process-level error types
//!
//! Errors raised while starting up: resolving credentials, connecting to the
//! API server, parsing configuration and wiring telemetry. Per-request
//! failures are classified separately by [`crate::coordinator::LifecycleError`].

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for startup and server operations
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    /// Credential resolution or store connection failed. Fatal at startup.
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Failed to load kubeconfig from {path}: {source}")]
    Kubeconfig {
        path: PathBuf,
        #[source]
        source: kube::config::KubeconfigError,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Telemetry error: {0}")]
    TelemetryError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors that mean the store can never be reached with the
    /// current credentials.
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection(_) | Error::Kubeconfig { .. })
    }
}
