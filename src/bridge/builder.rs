//! Builder pattern for bridge configuration.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use webview_bridge::Bridge;
//!
//! # fn example() -> webview_bridge::Result<()> {
//! let bridge = Bridge::builder()
//!     .binding_timeout(Duration::from_secs(3))
//!     .invoke_timeout(Duration::from_secs(2))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::Result;

use super::core::Bridge;
use super::options::{BridgeOptions, EchoPolicy};

// ============================================================================
// BridgeBuilder
// ============================================================================

/// Builder for configuring a [`Bridge`] instance.
///
/// Use [`Bridge::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct BridgeBuilder {
    options: BridgeOptions,
}

impl BridgeBuilder {
    /// Creates a builder with default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all options at once.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: BridgeOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets how long operations wait for the host to signal readiness.
    #[inline]
    #[must_use]
    pub fn binding_timeout(mut self, timeout: Duration) -> Self {
        self.options = self.options.with_binding_timeout(timeout);
        self
    }

    /// Sets the default deadline for invoke responses and emit acks.
    #[inline]
    #[must_use]
    pub fn invoke_timeout(mut self, timeout: Duration) -> Self {
        self.options = self.options.with_invoke_timeout(timeout);
        self
    }

    /// Sets the maximum number of in-flight calls.
    #[inline]
    #[must_use]
    pub fn max_pending(mut self, max: usize) -> Self {
        self.options = self.options.with_max_pending(max);
        self
    }

    /// Sets whether `emit` delivers to local subscribers directly.
    #[inline]
    #[must_use]
    pub fn echo_policy(mut self, policy: EchoPolicy) -> Self {
        self.options = self.options.with_echo_policy(policy);
        self
    }

    /// Sets the delay between WebSocket dial attempts.
    #[inline]
    #[must_use]
    pub fn connect_retry_interval(mut self, interval: Duration) -> Self {
        self.options = self.options.with_connect_retry_interval(interval);
        self
    }

    /// Builds the bridge with validation.
    ///
    /// The bridge starts unbound; attach a transport before (or while)
    /// issuing calls.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if any option is invalid.
    pub fn build(self) -> Result<Bridge> {
        self.options.validate()?;
        Ok(Bridge::new(self.options))
    }
}

// ============================================================================
// Tests
// ============================================================================
