//! Named event registry and dispatch.
//!
//! [`EventBus`] maps event names to ordered subscriber lists. Dispatch
//! calls every active subscriber for a name in registration order and
//! isolates failures: a subscriber that returns an error or panics is
//! logged and counted, and the remaining subscribers still run.
//!
//! Subscriptions are removed only through their [`Unlisten`] handle.
//! Dropping the handle does not unsubscribe; a forgotten subscription
//! lives as long as the registry.

// ============================================================================
// Imports
// ============================================================================

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::{debug, error};

use crate::error::Result;
use crate::identifiers::SubscriptionId;

// ============================================================================
// Types
// ============================================================================

/// Type-erased subscriber callback.
///
/// Receives the event name and its raw payload.
pub type EventCallback = Arc<dyn Fn(&str, &Value) -> Result<()> + Send + Sync>;

/// One registration in the bus.
#[derive(Clone)]
struct Subscription {
    id: SubscriptionId,
    active: Arc<AtomicBool>,
    callback: EventCallback,
}

impl Subscription {
    #[inline]
    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

type Registry = FxHashMap<String, Vec<Subscription>>;

// ============================================================================
// DispatchReport
// ============================================================================

/// Outcome of one dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Subscribers that ran to completion.
    pub delivered: usize,
    /// Subscribers that returned an error or panicked.
    pub failed: usize,
}

// ============================================================================
// EventBus
// ============================================================================

/// Registry of named event subscriptions.
///
/// Cloning yields another handle to the same registry.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("events", &self.registry.lock().len())
            .finish()
    }
}

impl EventBus {
    /// Creates an empty bus.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for `event`, after any existing subscribers.
    ///
    /// Never fails and never suspends.
    pub fn subscribe<F>(&self, event: impl Into<String>, callback: F) -> Unlisten
    where
        F: Fn(&str, &Value) -> Result<()> + Send + Sync + 'static,
    {
        let event = event.into();
        let id = SubscriptionId::next();
        let active = Arc::new(AtomicBool::new(true));

        {
            let mut registry = self.registry.lock();
            let subscribers = registry.entry(event.clone()).or_default();
            subscribers.retain(Subscription::is_active);
            subscribers.push(Subscription {
                id,
                active: Arc::clone(&active),
                callback: Arc::new(callback),
            });
        }

        debug!(%event, subscription = %id, "Subscribed");

        Unlisten {
            id,
            event: event.into(),
            active,
        }
    }

    /// Delivers `payload` to every active subscriber of `event`.
    ///
    /// Subscribers run synchronously, in registration order, with no lock
    /// held; a callback may subscribe or unlisten from inside dispatch. A
    /// subscriber unlistened earlier in the same dispatch is skipped.
    pub fn dispatch(&self, event: &str, payload: &Value) -> DispatchReport {
        let snapshot = {
            let mut registry = self.registry.lock();
            let Some(subscribers) = registry.get_mut(event) else {
                return DispatchReport::default();
            };

            subscribers.retain(Subscription::is_active);
            if subscribers.is_empty() {
                registry.remove(event);
                return DispatchReport::default();
            }

            subscribers.clone()
        };

        let mut report = DispatchReport::default();

        for subscription in &snapshot {
            if !subscription.is_active() {
                continue;
            }

            match catch_unwind(AssertUnwindSafe(|| (subscription.callback)(event, payload))) {
                Ok(Ok(())) => report.delivered += 1,

                Ok(Err(e)) => {
                    report.failed += 1;
                    error!(%event, subscription = %subscription.id, error = %e, "Event subscriber failed");
                }

                Err(panic) => {
                    report.failed += 1;
                    error!(
                        %event,
                        subscription = %subscription.id,
                        panic = panic_message(panic.as_ref()),
                        "Event subscriber panicked"
                    );
                }
            }
        }

        report
    }

    /// Returns the number of active subscribers for `event`.
    #[must_use]
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.registry
            .lock()
            .get(event)
            .map_or(0, |subscribers| {
                subscribers.iter().filter(|s| s.is_active()).count()
            })
    }

    /// Drops inactive subscriptions and empty event entries.
    ///
    /// Returns the number of subscriptions removed.
    pub fn prune(&self) -> usize {
        let mut registry = self.registry.lock();
        let mut removed = 0;

        registry.retain(|_, subscribers| {
            let before = subscribers.len();
            subscribers.retain(Subscription::is_active);
            removed += before - subscribers.len();
            !subscribers.is_empty()
        });

        removed
    }

    /// Returns the number of event names with at least one entry.
    #[inline]
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.registry.lock().len()
    }
}

/// Extracts a readable message from a panic payload.
fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

// ============================================================================
// Unlisten
// ============================================================================

/// Handle that deactivates one subscription.
///
/// Idempotent: only the first call has an effect.
#[derive(Debug, Clone)]
pub struct Unlisten {
    id: SubscriptionId,
    event: Arc<str>,
    active: Arc<AtomicBool>,
}

impl Unlisten {
    /// Deactivates the subscription.
    ///
    /// Returns `true` on the first call, `false` afterwards. Takes effect
    /// before the next dispatch for this event.
    pub fn unlisten(&self) -> bool {
        let was_active = self.active.swap(false, Ordering::AcqRel);
        if was_active {
            debug!(event = %self.event, subscription = %self.id, "Unsubscribed");
        }
        was_active
    }

    /// Returns the subscription ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns the event name.
    #[inline]
    #[must_use]
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Returns `true` until [`unlisten`](Self::unlisten) is called.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

// ============================================================================
// Tests
// ============================================================================
