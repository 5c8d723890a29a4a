//! Tagged frame enums.
//!
//! Each transport message carries exactly one frame, discriminated by its
//! `type` field.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::identifiers::CorrelationId;

use super::{EmitRequest, EventMessage, InvokeRequest, ReadyData, Response};

// ============================================================================
// ClientFrame
// ============================================================================

/// A frame sent from the bridge to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientFrame {
    /// Command request.
    Invoke(InvokeRequest),
    /// Event publication.
    Emit(EmitRequest),
}

impl ClientFrame {
    /// Returns the correlation ID of the frame.
    #[inline]
    #[must_use]
    pub fn id(&self) -> CorrelationId {
        match self {
            Self::Invoke(request) => request.id,
            Self::Emit(request) => request.id,
        }
    }

    /// Returns the command or event name, for errors and logs.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Invoke(request) => &request.command,
            Self::Emit(request) => &request.event,
        }
    }

    /// Parses a client frame from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if the text is not a valid frame.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

// ============================================================================
// HostFrame
// ============================================================================

/// A frame sent from the host to the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HostFrame {
    /// Ready handshake.
    Ready(ReadyData),
    /// Response to an invoke or emit.
    Response(Response),
    /// Named event notification.
    Event(EventMessage),
}

impl HostFrame {
    /// Parses a host frame from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if the text is not a valid frame.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serializes the frame to JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if serialization fails.
    pub fn to_text(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
