//! Bridge wire protocol.
//!
//! This module defines the JSON frames exchanged between the bridge
//! (client, running beside the webview script) and the native host.
//!
//! # Protocol Overview
//!
//! | Frame | Direction | Purpose |
//! |-------|-----------|---------|
//! | `invoke` | Client → Host | Command request |
//! | `emit` | Client → Host | Event publication |
//! | `ready` | Host → Client | Binding is usable |
//! | `response` | Host → Client | Result of an `invoke`, or ack of an `emit` |
//! | `event` | Host → Client | Named event notification |
//!
//! Every frame is a JSON object tagged by its `type` field.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `frame` | Tagged client/host frame enums |
//! | `event` | Event and ready payloads |
//! | `request` | Invoke/emit requests and responses |

// ============================================================================
// Submodules
// ============================================================================

/// Event notification and ready handshake payloads.
pub mod event;

/// Tagged frame enums for both directions.
pub mod frame;

/// Request and response message types.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use event::{EventMessage, ReadyData};
pub use frame::{ClientFrame, HostFrame};
pub use request::{
    EmitRequest, HostException, HostFailure, InvokeRequest, Response, ResponseStatus,
    TracebackFrame,
};
