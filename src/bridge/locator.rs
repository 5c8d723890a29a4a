//! Host binding locator.
//!
//! Holds the single binding slot shared by every bridge operation. The
//! slot starts unresolved; it is written once, when the host signals
//! readiness, and read thereafter.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::transport::Connection;

// ============================================================================
// BindingLocator
// ============================================================================

/// Resolves the host binding, waiting for it if necessary.
#[derive(Debug)]
pub struct BindingLocator {
    slot: watch::Sender<Option<Connection>>,
    wait: Duration,
}

impl BindingLocator {
    /// Creates an unresolved locator whose waiters give up after `wait`.
    #[must_use]
    pub fn new(wait: Duration) -> Self {
        let (slot, _) = watch::channel(None);
        Self { slot, wait }
    }

    /// Returns the configured wait.
    #[inline]
    #[must_use]
    pub fn wait(&self) -> Duration {
        self.wait
    }

    /// Returns `true` once the binding is resolved.
    #[inline]
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.slot.borrow().is_some()
    }

    /// Returns the binding if already resolved, without waiting.
    #[inline]
    #[must_use]
    pub fn try_binding(&self) -> Option<Connection> {
        self.slot.borrow().clone()
    }

    /// Resolves the binding.
    ///
    /// Returns `false`, leaving the existing binding untouched, if it was
    /// already resolved.
    pub fn resolve(&self, connection: Connection) -> bool {
        let mut incoming = Some(connection);

        let resolved = self.slot.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = incoming.take();
            true
        });

        if resolved {
            debug!("Host binding resolved");
        } else {
            warn!("Host binding already resolved; ignoring");
        }

        resolved
    }

    /// Returns the binding, waiting for the host to signal readiness.
    ///
    /// Resolves immediately once the binding exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BindingUnavailable`] if the binding is not resolved
    /// within the configured wait.
    pub async fn await_binding(&self) -> Result<Connection> {
        if let Some(connection) = self.try_binding() {
            return Ok(connection);
        }

        let mut rx = self.slot.subscribe();
        let unavailable = || Error::binding_unavailable(self.wait.as_millis() as u64);

        match timeout(self.wait, rx.wait_for(Option::is_some)).await {
            Ok(Ok(slot)) => slot.clone().ok_or_else(unavailable),
            Ok(Err(_)) | Err(_) => {
                debug!(wait_ms = self.wait.as_millis() as u64, "Host binding unavailable");
                Err(unavailable())
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
