//! Worker error types and error categorization
//!
//! Errors are categorized to decide how the consumer reacts:
//! - **Transport**: connection refused, lost, or broken at the protocol level. Logged as a
//!   warning, the consumer falls back to `Disconnected` and reconnects after backoff.
//! - **Unexpected**: anything else inside a connect/consume cycle. Logged as an error and
//!   folded into the same backoff path; the process never exits because of it.
//! - **Fatal**: configuration problems and shutdown. Only reachable outside the consume loop.

use core_config::ConfigError;
use std::fmt;
use thiserror::Error;

/// Category of error for determining consumer behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Transport,
    Unexpected,
    Fatal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Transport => write!(f, "transport"),
            ErrorCategory::Unexpected => write!(f, "unexpected"),
            ErrorCategory::Fatal => write!(f, "fatal"),
        }
    }
}

/// Queue worker errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Connection refused, reset, or otherwise unusable
    #[error("Broker connection error: {0}")]
    Connection(String),

    /// AMQP protocol-level failure (connection or channel closed by the broker)
    #[error("Broker protocol error: {0}")]
    Protocol(String),

    /// Any other broker client failure
    #[error("Broker error: {0}")]
    Broker(String),

    /// Serialization error while encoding an outgoing message
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The broker negatively confirmed a publish
    #[error("Publish not confirmed by broker: {0}")]
    PublishRejected(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Shutdown requested
    #[error("Shutdown requested")]
    Shutdown,
}

impl WorkerError {
    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            WorkerError::Connection(_) | WorkerError::Protocol(_) => ErrorCategory::Transport,
            WorkerError::Broker(_)
            | WorkerError::Serialization(_)
            | WorkerError::PublishRejected(_)
            | WorkerError::Internal(_) => ErrorCategory::Unexpected,
            WorkerError::Config(_) | WorkerError::Shutdown => ErrorCategory::Fatal,
        }
    }

    /// Check if this is a connection-level failure
    pub fn is_transport(&self) -> bool {
        self.category() == ErrorCategory::Transport
    }
}

impl From<lapin::Error> for WorkerError {
    fn from(err: lapin::Error) -> Self {
        match err {
            lapin::Error::IOError(_)
            | lapin::Error::InvalidConnectionState(_)
            | lapin::Error::InvalidChannelState(_) => WorkerError::Connection(err.to_string()),
            lapin::Error::ProtocolError(_) => WorkerError::Protocol(err.to_string()),
            other => WorkerError::Broker(other.to_string()),
        }
    }
}

impl From<ConfigError> for WorkerError {
    fn from(err: ConfigError) -> Self {
        WorkerError::Config(err.to_string())
    }
}
