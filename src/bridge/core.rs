//! Core bridge implementation.
//!
//! [`Bridge`] is the API surface exposed to UI code: `invoke`, `listen`
//! and `emit`, on top of a host binding that may appear after the bridge
//! is created.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::protocol::{ClientFrame, EmitRequest, InvokeRequest, ReadyData};
use crate::transport::{Connection, HostListener, Transport, websocket};

use super::builder::BridgeBuilder;
use super::events::{EventBus, Unlisten};
use super::locator::BindingLocator;
use super::options::{BridgeOptions, EchoPolicy};

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for a bridge.
struct BridgeInner {
    /// Validated configuration.
    options: BridgeOptions,
    /// Host binding slot.
    locator: BindingLocator,
    /// Named event subscriptions.
    events: EventBus,
}

// ============================================================================
// Bridge
// ============================================================================

/// Client side of the host bridge.
///
/// Cheap to clone; clones share the binding and the event registry.
///
/// # Example
///
/// ```no_run
/// use webview_bridge::Bridge;
///
/// # async fn example() -> webview_bridge::Result<()> {
/// let bridge = Bridge::builder().build()?;
/// bridge.connect("ws://127.0.0.1:9400").await?;
///
/// let unlisten = bridge.listen("time", |_, time: String| {
///     println!("time is {time}");
/// });
///
/// let greeting: String = bridge.invoke("greet", ()).await?;
/// bridge.emit("message", greeting).await?;
///
/// unlisten.unlisten();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("ready", &self.is_ready())
            .field("echo_policy", &self.inner.options.echo_policy)
            .field("events", &self.inner.events)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Bridge - Constructor
// ============================================================================

impl Bridge {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> BridgeBuilder {
        BridgeBuilder::new()
    }

    /// Creates an unbound bridge from validated options.
    pub(crate) fn new(options: BridgeOptions) -> Self {
        Self {
            inner: Arc::new(BridgeInner {
                locator: BindingLocator::new(options.binding_timeout),
                events: EventBus::new(),
                options,
            }),
        }
    }
}

// ============================================================================
// Bridge - Accessors
// ============================================================================

impl Bridge {
    /// Returns the bridge configuration.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &BridgeOptions {
        &self.inner.options
    }

    /// Returns the event registry.
    #[inline]
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    /// Returns the binding locator.
    #[inline]
    #[must_use]
    pub fn locator(&self) -> &BindingLocator {
        &self.inner.locator
    }

    /// Returns `true` once the host has signalled readiness.
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.inner.locator.is_resolved()
    }

    /// Waits for the host binding.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BindingUnavailable`] if the host does not signal
    /// readiness within the binding timeout.
    pub async fn await_binding(&self) -> Result<Connection> {
        self.inner.locator.await_binding().await
    }
}

// ============================================================================
// Bridge - Binding
// ============================================================================

impl Bridge {
    /// Attaches a transport and waits for the host's ready frame.
    ///
    /// Host events start flowing to subscribers as soon as the transport is
    /// attached; calls start flowing once the host is ready.
    ///
    /// # Errors
    ///
    /// - [`Error::BindingUnavailable`] if no ready frame arrives in time
    /// - [`Error::ConnectionClosed`] if the transport ends before ready
    /// - [`Error::Connection`] if a binding is already resolved
    pub async fn attach(&self, transport: Transport) -> Result<ReadyData> {
        let wait = self.inner.options.binding_timeout;
        let (connection, ready_rx) = Connection::spawn(
            transport,
            self.inner.events.clone(),
            self.inner.options.max_pending,
        );

        let ready = match timeout(wait, ready_rx).await {
            Ok(Ok(ready)) => ready,
            Ok(Err(_)) => {
                connection.shutdown();
                return Err(Error::ConnectionClosed);
            }
            Err(_) => {
                connection.shutdown();
                debug!(wait_ms = wait.as_millis() as u64, "Host never signalled ready");
                return Err(Error::binding_unavailable(wait.as_millis() as u64));
            }
        };

        if !self.inner.locator.resolve(connection.clone()) {
            connection.shutdown();
            return Err(Error::connection("host binding already resolved"));
        }

        info!(window = ?ready.window, host = ?ready.host, "Host binding ready");
        Ok(ready)
    }

    /// Dials the host WebSocket at `url` and attaches to it.
    ///
    /// Dialing is retried until the binding timeout while the host starts.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `url` is not a WebSocket URL
    /// - Any error from [`attach`](Self::attach)
    pub async fn connect(&self, url: &str) -> Result<ReadyData> {
        let transport = websocket::connect(
            url,
            self.inner.options.connect_retry_interval,
            self.inner.options.binding_timeout,
        )
        .await?;

        self.attach(transport).await
    }

    /// Waits for the host to dial `listener`, then attaches to it.
    ///
    /// # Errors
    ///
    /// - [`Error::BindingUnavailable`] if the host does not connect in time
    /// - Any error from [`attach`](Self::attach)
    pub async fn accept(&self, listener: HostListener) -> Result<ReadyData> {
        let transport = listener.accept(self.inner.options.binding_timeout).await?;
        self.attach(transport).await
    }

    /// Shuts down the host binding, if resolved.
    ///
    /// Pending calls fail with [`Error::ConnectionClosed`].
    pub fn shutdown(&self) {
        if let Some(connection) = self.inner.locator.try_binding() {
            debug!("Shutting down host binding");
            connection.shutdown();
        }
    }
}

// ============================================================================
// Bridge - Invoke
// ============================================================================

impl Bridge {
    /// Invokes a host command and decodes its result.
    ///
    /// Pass `()` for commands without arguments.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `command` is empty
    /// - [`Error::Serialization`] if `args` cannot be encoded or the result
    ///   does not decode as `T`
    /// - [`Error::BindingUnavailable`] if the host never becomes ready
    /// - [`Error::HostCall`] if the host reports a failure
    /// - [`Error::RequestTimeout`] if no response arrives in time
    pub async fn invoke<T, A>(&self, command: &str, args: A) -> Result<T>
    where
        T: DeserializeOwned,
        A: Serialize,
    {
        self.invoke_with_timeout(command, args, self.inner.options.invoke_timeout)
            .await
    }

    /// Invokes a host command and returns its raw result.
    ///
    /// # Errors
    ///
    /// See [`invoke`](Self::invoke).
    pub async fn invoke_value<A: Serialize>(&self, command: &str, args: A) -> Result<Value> {
        self.invoke(command, args).await
    }

    /// Invokes a host command with a custom response deadline.
    ///
    /// # Errors
    ///
    /// See [`invoke`](Self::invoke).
    pub async fn invoke_with_timeout<T, A>(
        &self,
        command: &str,
        args: A,
        call_timeout: Duration,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        A: Serialize,
    {
        require_name("command", command)?;
        let args = encode(&args)?;

        let connection = self.inner.locator.await_binding().await?;
        let request = InvokeRequest::new(command, args);
        debug!(id = %request.id, command, "Invoking host command");

        let response = connection
            .send_with_timeout(ClientFrame::Invoke(request), call_timeout)
            .await?;

        let value = response.into_result(command)?;
        serde_json::from_value(value).map_err(|e| {
            Error::serialization(format!("Result of '{command}' did not decode: {e}"))
        })
    }
}

// ============================================================================
// Bridge - Events
// ============================================================================

impl Bridge {
    /// Subscribes to `event`, decoding each payload as `T`.
    ///
    /// A payload that does not decode is reported for this subscriber and
    /// skipped. The subscription lasts until [`Unlisten::unlisten`] is
    /// called; dropping the handle does not unsubscribe.
    pub fn listen<T, F>(&self, event: impl Into<String>, handler: F) -> Unlisten
    where
        T: DeserializeOwned + 'static,
        F: Fn(&str, T) + Send + Sync + 'static,
    {
        self.try_listen(event, move |name, payload: T| {
            handler(name, payload);
            Ok(())
        })
    }

    /// Subscribes to `event` with a fallible handler.
    ///
    /// Errors returned by `handler` are logged and never propagated.
    pub fn try_listen<T, F>(&self, event: impl Into<String>, handler: F) -> Unlisten
    where
        T: DeserializeOwned + 'static,
        F: Fn(&str, T) -> Result<()> + Send + Sync + 'static,
    {
        self.inner.events.subscribe(event, move |name, payload| {
            let decoded: T = Deserialize::deserialize(payload).map_err(|e| {
                Error::serialization(format!("Payload of '{name}' did not decode: {e}"))
            })?;
            handler(name, decoded)
        })
    }

    /// Subscribes to `event` with the raw payload.
    pub fn listen_value<F>(&self, event: impl Into<String>, handler: F) -> Unlisten
    where
        F: Fn(&str, &Value) + Send + Sync + 'static,
    {
        self.inner.events.subscribe(event, move |name, payload| {
            handler(name, payload);
            Ok(())
        })
    }

    /// Publishes `event` through the host.
    ///
    /// Resolves once the host acknowledges the event. Under
    /// [`EchoPolicy::HostEcho`] local subscribers observe the event only if
    /// the host relays it back; under [`EchoPolicy::LocalFanOut`] they are
    /// also called directly after the ack.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `event` is empty
    /// - [`Error::Serialization`] if `payload` cannot be encoded
    /// - [`Error::BindingUnavailable`] if the host never becomes ready
    /// - [`Error::HostCall`] if the host rejects the event
    /// - [`Error::RequestTimeout`] if the host does not acknowledge in time
    pub async fn emit<P: Serialize>(&self, event: &str, payload: P) -> Result<()> {
        require_name("event", event)?;
        let data = encode(&payload)?;

        let connection = self.inner.locator.await_binding().await?;
        let request = EmitRequest::new(event, data);
        debug!(id = %request.id, event, "Emitting event");

        let local = match self.inner.options.echo_policy {
            EchoPolicy::LocalFanOut => Some(request.data.clone()),
            EchoPolicy::HostEcho => None,
        };

        connection
            .send_with_timeout(ClientFrame::Emit(request), self.inner.options.invoke_timeout)
            .await?
            .into_result(event)?;

        if let Some(data) = local {
            self.inner.events.dispatch(event, &data);
        }

        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Rejects empty command or event names.
fn require_name(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_argument(format!("{kind} name must not be empty")));
    }
    Ok(())
}

/// Encodes a payload for the transport.
fn encode<P: Serialize>(payload: &P) -> Result<Value> {
    serde_json::to_value(payload).map_err(|e| Error::serialization(e.to_string()))
}

// ============================================================================
// Tests
// ============================================================================
