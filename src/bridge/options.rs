//! Bridge configuration options.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use webview_bridge::{BridgeOptions, EchoPolicy};
//!
//! let options = BridgeOptions::new()
//!     .with_binding_timeout(Duration::from_secs(3))
//!     .with_echo_policy(EchoPolicy::LocalFanOut);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};
use crate::transport::connection::{DEFAULT_CALL_TIMEOUT, DEFAULT_MAX_PENDING};

// ============================================================================
// Constants
// ============================================================================

/// Default wait for the host to signal readiness.
pub const DEFAULT_BINDING_TIMEOUT: Duration = Duration::from_secs(10);

/// Default delay between WebSocket dial attempts.
pub const DEFAULT_CONNECT_RETRY_INTERVAL: Duration = Duration::from_millis(100);

// ============================================================================
// EchoPolicy
// ============================================================================

/// Whether `emit` notifies local subscribers directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EchoPolicy {
    /// Local subscribers see an emitted event only when the host relays it
    /// back as an event frame.
    #[default]
    HostEcho,
    /// After the host acknowledges, `emit` also dispatches to local
    /// subscribers. Pair with hosts that do not echo to the origin, or
    /// subscribers see the event twice.
    LocalFanOut,
}

// ============================================================================
// BridgeOptions
// ============================================================================

/// Bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeOptions {
    /// How long operations wait for the host binding.
    pub binding_timeout: Duration,

    /// Default deadline for `invoke` responses and `emit` acks.
    pub invoke_timeout: Duration,

    /// Maximum in-flight calls per connection.
    pub max_pending: usize,

    /// Local delivery policy for `emit`.
    pub echo_policy: EchoPolicy,

    /// Delay between WebSocket dial attempts.
    pub connect_retry_interval: Duration,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl BridgeOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            binding_timeout: DEFAULT_BINDING_TIMEOUT,
            invoke_timeout: DEFAULT_CALL_TIMEOUT,
            max_pending: DEFAULT_MAX_PENDING,
            echo_policy: EchoPolicy::HostEcho,
            connect_retry_interval: DEFAULT_CONNECT_RETRY_INTERVAL,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl BridgeOptions {
    /// Sets the binding timeout.
    #[inline]
    #[must_use]
    pub fn with_binding_timeout(mut self, timeout: Duration) -> Self {
        self.binding_timeout = timeout;
        self
    }

    /// Sets the default invoke timeout.
    #[inline]
    #[must_use]
    pub fn with_invoke_timeout(mut self, timeout: Duration) -> Self {
        self.invoke_timeout = timeout;
        self
    }

    /// Sets the pending call limit.
    #[inline]
    #[must_use]
    pub fn with_max_pending(mut self, max: usize) -> Self {
        self.max_pending = max;
        self
    }

    /// Sets the echo policy.
    #[inline]
    #[must_use]
    pub fn with_echo_policy(mut self, policy: EchoPolicy) -> Self {
        self.echo_policy = policy;
        self
    }

    /// Sets the WebSocket dial retry interval.
    #[inline]
    #[must_use]
    pub fn with_connect_retry_interval(mut self, interval: Duration) -> Self {
        self.connect_retry_interval = interval;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl BridgeOptions {
    /// Checks the options for values the bridge cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first invalid option.
    pub fn validate(&self) -> Result<()> {
        if self.binding_timeout.is_zero() {
            return Err(Error::config("binding_timeout must be greater than zero"));
        }

        if self.invoke_timeout.is_zero() {
            return Err(Error::config("invoke_timeout must be greater than zero"));
        }

        if self.max_pending == 0 {
            return Err(Error::config("max_pending must be at least 1"));
        }

        if self.connect_retry_interval > self.binding_timeout {
            return Err(Error::config(format!(
                "connect_retry_interval ({}ms) exceeds binding_timeout ({}ms)",
                self.connect_retry_interval.as_millis(),
                self.binding_timeout.as_millis()
            )));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
