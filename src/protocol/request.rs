//! Request and Response message types.
//!
//! Defines the `invoke` and `emit` requests sent to the host and the
//! `response` frame it answers both with.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::CorrelationId;

// ============================================================================
// InvokeRequest
// ============================================================================

/// A command request from client to host.
///
/// # Format
///
/// ```json
/// {
///   "type": "invoke",
///   "id": "uuid",
///   "command": "greet",
///   "args": null
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvokeRequest {
    /// Unique identifier for request/response correlation.
    pub id: CorrelationId,

    /// Command name known to the host.
    pub command: String,

    /// Encoded arguments (`null` when none).
    #[serde(default)]
    pub args: Value,
}

impl InvokeRequest {
    /// Creates a new request with auto-generated ID.
    #[inline]
    #[must_use]
    pub fn new(command: impl Into<String>, args: Value) -> Self {
        Self {
            id: CorrelationId::generate(),
            command: command.into(),
            args,
        }
    }
}

// ============================================================================
// EmitRequest
// ============================================================================

/// An event publication from client to host.
///
/// The host acknowledges with a [`Response`] carrying the same `id`.
///
/// # Format
///
/// ```json
/// {
///   "type": "emit",
///   "id": "uuid",
///   "event": "message",
///   "data": "hello"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmitRequest {
    /// Unique identifier for ack correlation.
    pub id: CorrelationId,

    /// Event name.
    pub event: String,

    /// Encoded payload.
    #[serde(default)]
    pub data: Value,
}

impl EmitRequest {
    /// Creates a new emit request with auto-generated ID.
    #[inline]
    #[must_use]
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            id: CorrelationId::generate(),
            event: event.into(),
            data,
        }
    }
}

// ============================================================================
// Response
// ============================================================================

/// A response from host to client.
///
/// # Format
///
/// Success:
/// ```json
/// { "type": "response", "id": "uuid", "status": "success", "data": "Hello World!" }
/// ```
///
/// Error (plain or structured message):
/// ```json
/// { "type": "response", "id": "uuid", "status": "error", "message": "Command greet not found" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Matches the request `id`.
    pub id: CorrelationId,

    /// Outcome discriminator.
    pub status: ResponseStatus,

    /// Result data (if success).
    #[serde(default)]
    pub data: Value,

    /// Failure detail (if error).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<HostFailure>,
}

impl Response {
    /// Creates a success response.
    #[inline]
    #[must_use]
    pub fn success(id: CorrelationId, data: Value) -> Self {
        Self {
            id,
            status: ResponseStatus::Success,
            data,
            message: None,
        }
    }

    /// Creates an error response.
    #[inline]
    #[must_use]
    pub fn error(id: CorrelationId, failure: HostFailure) -> Self {
        Self {
            id,
            status: ResponseStatus::Error,
            data: Value::Null,
            message: Some(failure),
        }
    }

    /// Returns `true` if this is a success response.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }

    /// Returns `true` if this is an error response.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status == ResponseStatus::Error
    }

    /// Extracts the result value, returning error if response was error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HostCall`] tagged with `command` if the host
    /// reported a failure.
    pub fn into_result(self, command: &str) -> Result<Value> {
        match self.status {
            ResponseStatus::Success => Ok(self.data),
            ResponseStatus::Error => {
                let failure = self
                    .message
                    .unwrap_or_else(|| HostFailure::message("unknown error"));
                Err(Error::host_call(command, failure))
            }
        }
    }
}

// ============================================================================
// ResponseStatus
// ============================================================================

/// Response status discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    /// Command ran and returned a value.
    Success,
    /// Command failed or was not found.
    Error,
}

// ============================================================================
// HostFailure
// ============================================================================

/// Failure detail reported by the host.
///
/// Hosts report either a plain message (e.g. an unknown command) or a
/// structured exception with a traceback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HostFailure {
    /// Plain message.
    Message(String),
    /// Structured exception raised by a command handler.
    Exception(HostException),
}

impl HostFailure {
    /// Creates a plain message failure.
    #[inline]
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Returns the human-readable message.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Message(message) => message,
            Self::Exception(exception) => &exception.message,
        }
    }

    /// Returns the exception type name, if the host sent one.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        match self {
            Self::Message(_) => None,
            Self::Exception(exception) => Some(&exception.kind),
        }
    }

    /// Returns the traceback frames (empty for plain messages).
    #[must_use]
    pub fn traceback(&self) -> &[TracebackFrame] {
        match self {
            Self::Message(_) => &[],
            Self::Exception(exception) => &exception.traceback,
        }
    }
}

impl fmt::Display for HostFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message(message) => f.write_str(message),
            Self::Exception(exception) => write!(f, "{}: {}", exception.kind, exception.message),
        }
    }
}

/// Structured exception detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostException {
    /// Exception type name.
    #[serde(rename = "type")]
    pub kind: String,

    /// Exception message.
    pub message: String,

    /// Stack frames, innermost last.
    #[serde(default)]
    pub traceback: Vec<TracebackFrame>,
}

/// One frame of a host traceback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracebackFrame {
    /// Source file.
    #[serde(default)]
    pub file: String,

    /// Line number.
    #[serde(default)]
    pub line: Option<u32>,

    /// Function name.
    #[serde(default)]
    pub function: String,

    /// Source line text.
    #[serde(default)]
    pub code: Option<String>,
}

// ============================================================================
// Tests
// ============================================================================
