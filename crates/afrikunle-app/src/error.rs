//! Afrikunle — application error types.

use afrikunle_core::error::ClientError;
use thiserror::Error;

/// Startup and runtime errors for the client handle and CLI.
#[derive(Debug, Error)]
pub enum AppError {
    /// A configuration value is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The YAML configuration file could not be parsed.
    #[error("configuration file error: {0}")]
    ConfigFile(#[from] serde_yaml::Error),

    /// Reading a file or talking to the terminal failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Tracing or the OTLP exporter could not be set up.
    #[error("telemetry error: {0}")]
    Telemetry(String),

    /// A client operation failed.
    #[error(transparent)]
    Client(#[from] ClientError),
}

impl AppError {
    /// Text safe to show an end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Client(e) => e.user_message().to_owned(),
            other => other.to_string(),
        }
    }
}
