//! Error types for the webview bridge.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use webview_bridge::{Bridge, Result};
//!
//! async fn example(bridge: &Bridge) -> Result<()> {
//!     let greeting: String = bridge.invoke("greet", ()).await?;
//!     bridge.emit("message", greeting).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidArgument`] |
//! | Binding | [`Error::BindingUnavailable`], [`Error::Connection`], [`Error::ConnectionClosed`] |
//! | Call | [`Error::HostCall`], [`Error::RequestTimeout`], [`Error::TooManyPending`] |
//! | Protocol | [`Error::Serialization`], [`Error::UnknownCorrelation`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::CorrelationId;
use crate::protocol::HostFailure;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned by [`BridgeBuilder::build`](crate::BridgeBuilder::build)
    /// when options are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Invalid argument passed to a bridge operation.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    // ========================================================================
    // Binding Errors
    // ========================================================================
    /// Host binding never became reachable.
    ///
    /// Returned when the host does not signal readiness within the
    /// configured binding timeout (e.g. the page is not running inside the
    /// expected host).
    #[error("Host binding unavailable after {timeout_ms}ms")]
    BindingUnavailable {
        /// Milliseconds waited before giving up.
        timeout_ms: u64,
    },

    /// Transport could not be established.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Transport closed while a call was outstanding.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Call Errors
    // ========================================================================
    /// The host executed the command and reported a failure.
    #[error("Command '{command}' failed: {cause}")]
    HostCall {
        /// Command (or event name, for emit) that failed.
        command: String,
        /// Failure detail reported by the host.
        cause: HostFailure,
    },

    /// No response arrived for an invocation in time.
    #[error("Request {id} ({command}) timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// Correlation ID of the timed-out call.
        id: CorrelationId,
        /// Command name.
        command: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Too many invocations in flight on one connection.
    #[error("Too many pending requests: {pending}/{max}")]
    TooManyPending {
        /// Number currently pending.
        pending: usize,
        /// Configured maximum.
        max: usize,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// A payload could not be encoded or decoded across the transport.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the encoding failure.
        message: String,
    },

    /// A response arrived for an ID this client never issued (or already settled).
    ///
    /// Never returned to callers; logged and discarded by the event loop.
    #[error("Response for unknown correlation id: {id}")]
    UnknownCorrelation {
        /// The unrecognized ID.
        id: CorrelationId,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON error on a frame.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a binding unavailable error.
    #[inline]
    pub fn binding_unavailable(timeout_ms: u64) -> Self {
        Self::BindingUnavailable { timeout_ms }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a host call error.
    #[inline]
    pub fn host_call(command: impl Into<String>, cause: HostFailure) -> Self {
        Self::HostCall {
            command: command.into(),
            cause,
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(id: CorrelationId, command: impl Into<String>, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            id,
            command: command.into(),
            timeout_ms,
        }
    }

    /// Creates a too-many-pending error.
    #[inline]
    pub fn too_many_pending(pending: usize, max: usize) -> Self {
        Self::TooManyPending { pending, max }
    }

    /// Creates a serialization error.
    #[inline]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Creates an unknown correlation error.
    #[inline]
    pub fn unknown_correlation(id: CorrelationId) -> Self {
        Self::UnknownCorrelation { id }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::BindingUnavailable { .. } | Self::RequestTimeout { .. }
        )
    }

    /// Returns `true` if the host reported the failure.
    #[inline]
    #[must_use]
    pub fn is_host_error(&self) -> bool {
        matches!(self, Self::HostCall { .. })
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::BindingUnavailable { .. }
                | Self::Connection { .. }
                | Self::ConnectionClosed
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry. The bridge itself never
    /// retries.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::BindingUnavailable { .. }
                | Self::RequestTimeout { .. }
                | Self::TooManyPending { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::binding_unavailable(5000);
        assert_eq!(err.to_string(), "Host binding unavailable after 5000ms");
    }

    #[test]
    fn test_host_call_display() {
        let err = Error::host_call("greet", HostFailure::message("Command greet not found"));
        assert_eq!(
            err.to_string(),
            "Command 'greet' failed: Command greet not found"
        );
    }

    #[test]
    fn test_is_timeout() {
        let binding = Error::binding_unavailable(10);
        let request = Error::request_timeout(CorrelationId::generate(), "slow", 10);
        let other = Error::config("test");

        assert!(binding.is_timeout());
        assert!(request.is_timeout());
        assert!(!other.is_timeout());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connection("refused").is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(Error::binding_unavailable(1).is_connection_error());
        assert!(!Error::serialization("bad").is_connection_error());
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::too_many_pending(100, 100).is_recoverable());
        assert!(!Error::host_call("x", HostFailure::message("boom")).is_recoverable());
    }

    #[test]
    fn test_is_host_error() {
        assert!(Error::host_call("x", HostFailure::message("boom")).is_host_error());
        assert!(!Error::ConnectionClosed.is_host_error());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::ConnectionRefused, "refused");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
