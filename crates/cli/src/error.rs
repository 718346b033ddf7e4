//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Application-default credentials could not be resolved
    #[error("Failed to obtain Google Cloud credentials: {message}")]
    Credentials { message: String },

    /// Fatal control loop error
    #[error("Consumer stopped on a fatal error: {0}")]
    Consumer(#[from] consumer::ConsumerError),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn credentials(message: impl Into<String>) -> Self {
        Self::Credentials {
            message: message.into(),
        }
    }
}
