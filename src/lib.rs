//! Webview Bridge - invoke/listen/emit between webview script and its host.
//!
//! This library provides the client half of a host bridge: a typed
//! request/response channel and a named publish/subscribe channel, layered
//! over whatever low-level binding the native host supplies.
//!
//! # Architecture
//!
//! The bridge follows a client-host model:
//!
//! - **Client (this crate)**: Sends commands and events, receives responses
//!   and host events
//! - **Host (native process)**: Executes commands, relays events
//!
//! Key design principles:
//!
//! - The host binding is a write-once slot; calls wait for it instead of
//!   assuming it exists at first use
//! - Responses are matched by correlation ID, never by arrival order
//! - Each subscriber fails alone; dispatch continues past errors and panics
//! - One event loop task per binding (no polling)
//!
//! # Quick Start
//!
//! ```no_run
//! use webview_bridge::{Bridge, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let bridge = Bridge::builder().build()?;
//!     bridge.connect("ws://127.0.0.1:9400").await?;
//!
//!     let unlisten = bridge.listen("time", |_, time: String| {
//!         println!("Host time: {}", time);
//!     });
//!
//!     let greeting: String = bridge.invoke("greet", ()).await?;
//!     bridge.emit("message", greeting).await?;
//!
//!     unlisten.unlisten();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bridge`] | [`Bridge`], configuration, event bus, binding locator |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Wire frame types |
//! | [`transport`] | Channel and WebSocket transports, event loop |

// ============================================================================
// Modules
// ============================================================================

/// Bridge API: invoke, listen, emit.
///
/// - [`Bridge`] - Entry point
/// - [`EventBus`] - Subscriber registry
/// - [`BindingLocator`] - Host binding slot
pub mod bridge;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for calls and subscriptions.
pub mod identifiers;

/// Wire protocol frame types.
pub mod protocol;

/// Host transports and the connection event loop.
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Re-exports
// ============================================================================

// Bridge types
pub use bridge::{
    BindingLocator, Bridge, BridgeBuilder, BridgeOptions, DispatchReport, EchoPolicy, EventBus,
    Unlisten,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{CorrelationId, SubscriptionId};

// Protocol types
pub use protocol::{HostFailure, ReadyData};

// Transport types
pub use transport::{Connection, HostEndpoint, HostListener, HostSender, Transport};
