//! Response definitions
//!
//! Represents replies to clients.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::KeyValuePair;

/// Outcome of a unary operation: exactly one of value or error
///
/// The `Error` arm carries domain outcomes (key not found, unsupported
/// operation). Failures of the store itself travel as a `Status` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    Value(String),
    Error(String),
}

impl Response {
    /// Create a not-found response for `key`
    pub fn not_found(key: &str) -> Self {
        Response::Error(format!("Given key:{} not found", key))
    }

    /// Create the response for an operation the store does not support
    pub fn unsupported(operation: &str) -> Self {
        Response::Error(format!("Unsupported operation: {}", operation))
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Response::Value(v) => Some(v),
            Response::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Response::Value(_) => None,
            Response::Error(e) => Some(e),
        }
    }

    pub fn is_value(&self) -> bool {
        matches!(self, Response::Value(_))
    }
}

/// Transport-level status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCode {
    /// Request rejected before touching the log
    InvalidArgument,

    /// Store is shutting down or closed
    Unavailable,

    /// I/O or encoding failure while serving the request
    Internal,

    /// Caller stopped waiting
    DeadlineExceeded,
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusCode::InvalidArgument => "InvalidArgument",
            StatusCode::Unavailable => "Unavailable",
            StatusCode::Internal => "Internal",
            StatusCode::DeadlineExceeded => "DeadlineExceeded",
        };
        f.write_str(name)
    }
}

/// Transport-level error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub code: StatusCode,
    pub message: String,
}

impl Status {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Reply frame tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReplyKind {
    Unary = 0x00,
    Item = 0x01,
    End = 0x02,
    Status = 0x03,
}

/// A reply frame sent to the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Answer to Get, Set or Remove
    Unary(Response),

    /// One record of a List stream
    Item(KeyValuePair),

    /// End of a List stream
    End,

    /// Transport-level error; ends the current exchange
    Status(Status),
}

impl Reply {
    pub fn kind(&self) -> ReplyKind {
        match self {
            Reply::Unary(_) => ReplyKind::Unary,
            Reply::Item(_) => ReplyKind::Item,
            Reply::End => ReplyKind::End,
            Reply::Status(_) => ReplyKind::Status,
        }
    }

    pub fn status(code: StatusCode, message: impl Into<String>) -> Self {
        Reply::Status(Status::new(code, message))
    }
}
