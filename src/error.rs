//! Error types for kvlog
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

use crate::protocol::StatusCode;

/// Result type alias using KvError
pub type Result<T> = std::result::Result<T, KvError>;

/// Unified error type for kvlog operations
#[derive(Debug, Error)]
pub enum KvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Record Log Errors
    // -------------------------------------------------------------------------
    #[error("Record log is closed")]
    Closed,

    // -------------------------------------------------------------------------
    // Validation Errors
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Transport-level failure reported by the server
    #[error("{code}: {message}")]
    Status { code: StatusCode, message: String },

    #[error("Deadline exceeded after {0} ms")]
    DeadlineExceeded(u64),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl KvError {
    /// Transport status code used when this error crosses the wire
    pub fn status_code(&self) -> StatusCode {
        match self {
            KvError::InvalidArgument(_) | KvError::Protocol(_) => StatusCode::InvalidArgument,
            KvError::Closed => StatusCode::Unavailable,
            KvError::DeadlineExceeded(_) => StatusCode::DeadlineExceeded,
            KvError::Status { code, .. } => *code,
            KvError::Io(_)
            | KvError::Serialization(_)
            | KvError::Config(_) => StatusCode::Internal,
        }
    }
}

impl From<bincode::Error> for KvError {
    fn from(e: bincode::Error) -> Self {
        KvError::Serialization(e.to_string())
    }
}
