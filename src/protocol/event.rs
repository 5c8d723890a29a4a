//! Event message types.
//!
//! Host-originated payloads that are not responses: named event
//! notifications and the ready handshake.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// EventMessage
// ============================================================================

/// A named event notification from host to client.
///
/// # Format
///
/// ```json
/// {
///   "type": "event",
///   "event": "time",
///   "data": "12:00:00"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMessage {
    /// Event name.
    pub event: String,

    /// Event payload (`null` when absent).
    #[serde(default)]
    pub data: Value,
}

impl EventMessage {
    /// Creates a new event message.
    #[inline]
    #[must_use]
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }
}

// ============================================================================
// ReadyData
// ============================================================================

/// Data received in the ready handshake.
///
/// The host sends this once its side of the binding is usable. Both
/// fields are informational.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyData {
    /// Label of the window the bridge is attached to (e.g. `"main"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<String>,

    /// Free-form host identification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl ReadyData {
    /// Creates ready data for a named window.
    #[inline]
    #[must_use]
    pub fn for_window(window: impl Into<String>) -> Self {
        Self {
            window: Some(window.into()),
            host: None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_parsing() {
        let event: EventMessage =
            serde_json::from_str(r#"{"event": "time", "data": "12:00"}"#).expect("parse");
        assert_eq!(event.event, "time");
        assert_eq!(event.data, json!("12:00"));
    }

    #[test]
    fn test_event_without_data() {
        let event: EventMessage = serde_json::from_str(r#"{"event": "tick"}"#).expect("parse");
        assert_eq!(event.data, Value::Null);
    }

    #[test]
    fn test_ready_defaults() {
        let ready: ReadyData = serde_json::from_str("{}").expect("parse");
        assert_eq!(ready, ReadyData::default());

        let ready = ReadyData::for_window("main");
        let json = serde_json::to_string(&ready).expect("serialize");
        assert_eq!(json, r#"{"window":"main"}"#);
    }
}
