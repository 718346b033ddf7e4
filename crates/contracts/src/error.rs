//! Layered error definitions
//!
//! Categorized by source: config / transport / provider / message / sink

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Transport Errors =====
    /// Network-level or HTTP-status failure talking to an external service
    #[error("{service} transport error: {message}")]
    Transport {
        service: String,
        message: String,
        retryable: bool,
    },

    /// Service answered, but with an application-level error status
    #[error("{service} api error ({status}): {message}")]
    Api {
        service: String,
        status: String,
        message: String,
    },

    // ===== Message Errors =====
    /// Queue payload or attributes could not be decoded
    #[error("malformed message '{handle}': {message}")]
    MalformedMessage { handle: String, message: String },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a transport error that the retry helper may re-attempt
    pub fn transient(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            service: service.into(),
            message: message.into(),
            retryable: true,
        }
    }

    /// Create a transport error that must not be re-attempted
    pub fn transport(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            service: service.into(),
            message: message.into(),
            retryable: false,
        }
    }

    /// Create provider/api error
    pub fn api(
        service: impl Into<String>,
        status: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Api {
            service: service.into(),
            status: status.into(),
            message: message.into(),
        }
    }

    /// Create malformed message error
    pub fn malformed(handle: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedMessage {
            handle: handle.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Classify an HTTP status: 408, 429 and 5xx are worth another attempt
    pub fn from_status(service: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        let retryable = status == 408 || status == 429 || (500..600).contains(&status);
        Self::Transport {
            service: service.into(),
            message: format!("HTTP {status}: {}", body.into()),
            retryable,
        }
    }

    /// Whether a retry of the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { retryable: true, .. })
    }
}
