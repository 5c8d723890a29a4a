//! Bridge API module.
//!
//! This module provides the client-facing bridge: request/response calls
//! and named events over a host binding that may appear late.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Bridge`] | `invoke` / `listen` / `emit` entry point |
//! | [`BridgeBuilder`] | Fluent configuration builder |
//! | [`BridgeOptions`] | Timeouts, limits and echo policy |
//! | [`BindingLocator`] | Write-once host binding slot |
//! | [`EventBus`] | Ordered subscriber registry and dispatch |
//! | [`Unlisten`] | Idempotent unsubscribe handle |
//!
//! # Example
//!
//! ```no_run
//! use webview_bridge::{Bridge, Result};
//!
//! # async fn example() -> Result<()> {
//! let bridge = Bridge::builder().build()?;
//! bridge.connect("ws://127.0.0.1:9400").await?;
//!
//! let result: String = bridge.invoke("greet", ()).await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for bridge configuration.
pub mod builder;

/// Core bridge implementation.
pub mod core;

/// Event registry and dispatch.
pub mod events;

/// Host binding locator.
pub mod locator;

/// Bridge options.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::BridgeBuilder;
pub use core::Bridge;
pub use events::{DispatchReport, EventBus, EventCallback, Unlisten};
pub use locator::BindingLocator;
pub use options::{BridgeOptions, EchoPolicy};
