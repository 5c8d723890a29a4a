//! Host transport layer.
//!
//! This module carries bridge frames between the client and the native
//! host. A [`Transport`] is a pair of frame halves; [`Connection`] runs
//! the event loop on top of one.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Bridge (Rust)  │        FrameSink             │  Native Host    │
//! │                 │─────────────────────────────►│                 │
//! │  Connection     │        FrameSource           │  command        │
//! │  (event loop)   │◄─────────────────────────────│  dispatch       │
//! └─────────────────┘   channel | WebSocket        └─────────────────┘
//! ```
//!
//! # Transports
//!
//! | Module | Description |
//! |--------|-------------|
//! | `channel` | In-process mpsc pair (embedded hosts, tests) |
//! | `websocket` | Dial a host-provided `ws://` URL, retrying during startup |
//! | `server` | Bind a local port the host dials into |
//! | `connection` | Event loop and request/response correlation |

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;

use crate::error::Result;

// ============================================================================
// Submodules
// ============================================================================

/// In-process channel transport.
pub mod channel;

/// Connection event loop and correlation.
pub mod connection;

/// Listening WebSocket endpoint for hosts that dial in.
pub mod server;

/// WebSocket client transport.
pub mod websocket;

// ============================================================================
// Re-exports
// ============================================================================

pub use channel::{HostEndpoint, HostSender};
pub use connection::Connection;
pub use server::HostListener;

// ============================================================================
// Frame Traits
// ============================================================================

/// Outbound half of a transport.
#[async_trait]
pub trait FrameSink: Send {
    /// Sends one frame of JSON text to the host.
    ///
    /// Resolves once the transport has accepted the frame.
    async fn send_frame(&mut self, text: String) -> Result<()>;

    /// Closes the outbound half.
    async fn close(&mut self) -> Result<()>;
}

/// Inbound half of a transport.
#[async_trait]
pub trait FrameSource: Send {
    /// Receives the next frame of JSON text from the host.
    ///
    /// Returns `None` once the transport has ended. Must be cancel-safe:
    /// the event loop polls it inside `tokio::select!`.
    async fn next_frame(&mut self) -> Option<Result<String>>;
}

// ============================================================================
// Transport
// ============================================================================

/// A bidirectional frame transport to the host.
pub struct Transport {
    sink: Box<dyn FrameSink>,
    source: Box<dyn FrameSource>,
}

impl Transport {
    /// Creates a transport from its two halves.
    #[must_use]
    pub fn new(sink: impl FrameSink + 'static, source: impl FrameSource + 'static) -> Self {
        Self {
            sink: Box::new(sink),
            source: Box::new(source),
        }
    }

    /// Splits the transport into its halves.
    pub(crate) fn into_parts(self) -> (Box<dyn FrameSink>, Box<dyn FrameSource>) {
        (self.sink, self.source)
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport").finish_non_exhaustive()
    }
}
