//! Host connection and event loop.
//!
//! This module handles the live binding to the host, including
//! request/response correlation and event routing.
//!
//! # Event Loop
//!
//! The connection spawns a tokio task that handles:
//!
//! - Incoming frames from the host (ready, responses, events)
//! - Outgoing invoke/emit frames from the bridge API
//! - Request/response correlation by [`CorrelationId`]
//! - Synchronous dispatch of host events to the [`EventBus`]

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::to_string;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, timeout};
use tracing::{debug, error, trace, warn};

use crate::bridge::EventBus;
use crate::error::{Error, Result};
use crate::identifiers::CorrelationId;
use crate::protocol::{ClientFrame, HostFrame, ReadyData, Response};

use super::{FrameSink, Transport};

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for a correlated call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Default maximum pending calls before rejecting new ones.
pub const DEFAULT_MAX_PENDING: usize = 100;

// ============================================================================
// Types
// ============================================================================

/// A call awaiting its response.
struct PendingCall {
    /// Command or event name, for diagnostics.
    name: String,
    /// When the frame was handed to the transport.
    sent_at: Instant,
    /// Single-use result slot.
    response_tx: oneshot::Sender<Result<Response>>,
}

/// Map of correlation IDs to pending calls.
type CorrelationMap = FxHashMap<CorrelationId, PendingCall>;

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Internal commands for the event loop.
enum ConnectionCommand {
    /// Send a frame and wait for its response.
    Send {
        frame: ClientFrame,
        response_tx: oneshot::Sender<Result<Response>>,
    },
    /// Remove a timed-out correlation entry.
    RemoveCorrelation(CorrelationId),
    /// Shutdown the connection.
    Shutdown,
}

// ============================================================================
// Shared
// ============================================================================

/// State shared between handles and the event loop.
struct Shared {
    /// Pending calls.
    correlation: Mutex<CorrelationMap>,
    /// Calls reserved by callers, including frames not yet sent.
    in_flight: AtomicUsize,
    /// Responses discarded for unknown IDs.
    unknown_responses: AtomicU64,
    /// Pending call limit.
    max_pending: usize,
}

impl Shared {
    /// Reserves one in-flight slot, or reports how many are taken.
    fn reserve(&self) -> std::result::Result<InFlightSlot<'_>, usize> {
        self.in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |taken| {
                (taken < self.max_pending).then_some(taken + 1)
            })
            .map(|_| InFlightSlot { shared: self })
    }
}

/// Releases its in-flight slot when the caller stops waiting.
struct InFlightSlot<'a> {
    shared: &'a Shared,
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        self.shared.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

// ============================================================================
// Connection
// ============================================================================

/// Live binding to the host.
///
/// Handles request/response correlation and event routing.
/// The connection spawns an internal event loop task.
///
/// # Thread Safety
///
/// `Connection` is `Send + Sync` and cheap to clone; clones share the same
/// event loop.
#[derive(Clone)]
pub struct Connection {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    /// State shared with the event loop.
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("pending", &self.pending_count())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Creates a new connection over `transport`.
    ///
    /// Spawns the event loop task internally. Host events are dispatched to
    /// `events`. The returned receiver yields the host's ready handshake.
    pub(crate) fn spawn(
        transport: Transport,
        events: EventBus,
        max_pending: usize,
    ) -> (Self, oneshot::Receiver<ReadyData>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();

        let shared = Arc::new(Shared {
            correlation: Mutex::new(CorrelationMap::default()),
            in_flight: AtomicUsize::new(0),
            unknown_responses: AtomicU64::new(0),
            max_pending,
        });

        tokio::spawn(Self::run_event_loop(
            transport,
            command_rx,
            Arc::clone(&shared),
            events,
            ready_tx,
        ));

        (Self { command_tx, shared }, ready_rx)
    }

    /// Sends a frame and waits for response with default timeout (5s).
    ///
    /// # Errors
    ///
    /// See [`send_with_timeout`](Self::send_with_timeout).
    pub async fn send(&self, frame: ClientFrame) -> Result<Response> {
        self.send_with_timeout(frame, DEFAULT_CALL_TIMEOUT).await
    }

    /// Sends a frame and waits for its correlated response.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the connection is closed
    /// - [`Error::RequestTimeout`] if no response arrives within `call_timeout`
    /// - [`Error::TooManyPending`] if the pending call limit is reached
    pub async fn send_with_timeout(
        &self,
        frame: ClientFrame,
        call_timeout: Duration,
    ) -> Result<Response> {
        let id = frame.id();
        let name = frame.name().to_string();

        // Held until this call settles, times out or is dropped.
        let _slot = match self.shared.reserve() {
            Ok(slot) => slot,
            Err(pending) => {
                warn!(
                    pending,
                    max = self.shared.max_pending,
                    "Too many pending requests"
                );
                return Err(Error::too_many_pending(pending, self.shared.max_pending));
            }
        };

        let (response_tx, response_rx) = oneshot::channel();

        self.command_tx
            .send(ConnectionCommand::Send { frame, response_tx })
            .map_err(|_| Error::ConnectionClosed)?;

        match timeout(call_timeout, response_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => {
                // Timeout - clean up correlation entry
                let _ = self
                    .command_tx
                    .send(ConnectionCommand::RemoveCorrelation(id));

                Err(Error::request_timeout(
                    id,
                    name,
                    call_timeout.as_millis() as u64,
                ))
            }
        }
    }

    /// Returns the number of pending calls.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.shared.correlation.lock().len()
    }

    /// Returns the number of calls counted against `max_pending`.
    #[inline]
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    /// Returns how many responses were discarded for unknown IDs.
    #[inline]
    #[must_use]
    pub fn unknown_responses(&self) -> u64 {
        self.shared.unknown_responses.load(Ordering::Relaxed)
    }

    /// Returns `true` once the event loop has stopped.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.command_tx.is_closed()
    }

    /// Shuts down the connection.
    ///
    /// Pending calls fail with [`Error::ConnectionClosed`].
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(ConnectionCommand::Shutdown);
    }

    /// Event loop that owns the transport.
    async fn run_event_loop(
        transport: Transport,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        shared: Arc<Shared>,
        events: EventBus,
        ready_tx: oneshot::Sender<ReadyData>,
    ) {
        let (mut sink, mut source) = transport.into_parts();
        let mut ready_tx = Some(ready_tx);

        loop {
            tokio::select! {
                // Incoming frames from host
                frame = source.next_frame() => {
                    match frame {
                        Some(Ok(text)) => {
                            Self::handle_incoming_frame(&text, &shared, &events, &mut ready_tx);
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "Transport error");
                            break;
                        }

                        None => {
                            debug!("Transport ended");
                            break;
                        }
                    }
                }

                // Commands from bridge API
                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Send { frame, response_tx }) => {
                            Self::handle_send_command(frame, response_tx, &mut sink, &shared).await;
                        }

                        Some(ConnectionCommand::RemoveCorrelation(id)) => {
                            if let Some(pending) = shared.correlation.lock().remove(&id) {
                                debug!(%id, name = %pending.name, "Removed timed-out correlation");
                            }
                        }

                        Some(ConnectionCommand::Shutdown) => {
                            debug!("Shutdown command received");
                            let _ = sink.close().await;
                            break;
                        }

                        None => {
                            debug!("Command channel closed");
                            break;
                        }
                    }
                }
            }
        }

        // Fail all pending requests on shutdown
        Self::fail_pending_requests(&shared);

        debug!("Event loop terminated");
    }

    /// Handles one incoming frame from the host.
    fn handle_incoming_frame(
        text: &str,
        shared: &Shared,
        events: &EventBus,
        ready_tx: &mut Option<oneshot::Sender<ReadyData>>,
    ) {
        let frame = match HostFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, text = %text, "Failed to parse incoming frame");
                return;
            }
        };

        match frame {
            HostFrame::Response(response) => {
                let id = response.id;
                let pending = shared.correlation.lock().remove(&id);

                if let Some(pending) = pending {
                    trace!(
                        %id,
                        name = %pending.name,
                        elapsed_ms = pending.sent_at.elapsed().as_millis() as u64,
                        "Response received"
                    );
                    // Caller may have stopped waiting; the result is dropped.
                    let _ = pending.response_tx.send(Ok(response));
                } else {
                    shared.unknown_responses.fetch_add(1, Ordering::Relaxed);
                    warn!(error = %Error::unknown_correlation(id), "Discarding response");
                }
            }

            HostFrame::Event(event) => {
                let report = events.dispatch(&event.event, &event.data);
                trace!(
                    event = %event.event,
                    delivered = report.delivered,
                    failed = report.failed,
                    "Host event dispatched"
                );
            }

            HostFrame::Ready(data) => match ready_tx.take() {
                Some(tx) => {
                    let _ = tx.send(data);
                }
                None => warn!("Duplicate ready frame ignored"),
            },
        }
    }

    /// Handles a send command from the bridge API.
    async fn handle_send_command(
        frame: ClientFrame,
        response_tx: oneshot::Sender<Result<Response>>,
        sink: &mut Box<dyn FrameSink>,
        shared: &Shared,
    ) {
        let id = frame.id();

        let text = match to_string(&frame) {
            Ok(text) => text,
            Err(e) => {
                let _ = response_tx.send(Err(Error::serialization(e.to_string())));
                return;
            }
        };

        // Store correlation before sending
        shared.correlation.lock().insert(
            id,
            PendingCall {
                name: frame.name().to_string(),
                sent_at: Instant::now(),
                response_tx,
            },
        );

        if let Err(e) = sink.send_frame(text).await {
            if let Some(pending) = shared.correlation.lock().remove(&id) {
                let _ = pending.response_tx.send(Err(e));
            }
            return;
        }

        trace!(%id, name = %frame.name(), "Frame sent");
    }

    /// Fails all pending requests with ConnectionClosed error.
    fn fail_pending_requests(shared: &Shared) {
        let pending: Vec<_> = shared.correlation.lock().drain().collect();
        let count = pending.len();

        for (_, call) in pending {
            let _ = call.response_tx.send(Err(Error::ConnectionClosed));
        }

        if count > 0 {
            debug!(count, "Failed pending requests on shutdown");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::{Value, json};

    use crate::protocol::{EmitRequest, InvokeRequest};
    use crate::transport::channel;

    fn invoke(command: &str, args: Value) -> ClientFrame {
        ClientFrame::Invoke(InvokeRequest::new(command, args))
    }

    #[test]
    fn test_constants() {
        assert_eq!(DEFAULT_CALL_TIMEOUT.as_secs(), 5);
        assert_eq!(DEFAULT_MAX_PENDING, 100);
    }

    #[tokio::test]
    async fn test_ready_frame_is_forwarded() {
        let (transport, host) = channel::pair();
        let (_connection, ready_rx) = Connection::spawn(transport, EventBus::new(), 10);

        host.sender()
            .ready(ReadyData::for_window("main"))
            .expect("send ready");

        let ready = ready_rx.await.expect("ready");
        assert_eq!(ready.window.as_deref(), Some("main"));
    }

    #[tokio::test]
    async fn test_response_is_correlated() {
        let (transport, mut host) = channel::pair();
        let (connection, _ready) = Connection::spawn(transport, EventBus::new(), 10);
        let sender = host.sender();

        let call = tokio::spawn({
            let connection = connection.clone();
            async move { connection.send(invoke("echo", json!("hi"))).await }
        });

        let Some(Ok(ClientFrame::Invoke(request))) = host.recv().await else {
            panic!("expected invoke frame");
        };
        sender
            .respond(Response::success(request.id, request.args))
            .expect("respond");

        let response = call.await.expect("join").expect("response");
        assert_eq!(response.data, json!("hi"));
        assert_eq!(connection.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_response_is_discarded() {
        let (transport, host) = channel::pair();
        let (connection, ready_rx) = Connection::spawn(transport, EventBus::new(), 10);
        let sender = host.sender();

        sender
            .respond(Response::success(CorrelationId::generate(), Value::Null))
            .expect("respond");
        // Frames are processed in order, so ready arrives after the stray response.
        sender.ready(ReadyData::default()).expect("ready");
        ready_rx.await.expect("ready");

        assert_eq!(connection.unknown_responses(), 1);
        assert!(!connection.is_closed());
    }

    #[tokio::test]
    async fn test_garbage_frames_are_ignored() {
        let (transport, host) = channel::pair();
        let (connection, ready_rx) = Connection::spawn(transport, EventBus::new(), 10);
        let sender = host.sender();

        sender.send_text("not json").expect("send");
        sender.send_text(r#"{"type": "bogus"}"#).expect("send");
        sender.ready(ReadyData::default()).expect("ready");

        ready_rx.await.expect("ready");
        assert!(!connection.is_closed());
    }

    #[tokio::test]
    async fn test_host_events_reach_bus() {
        let (transport, host) = channel::pair();
        let events = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let _unlisten = events.subscribe("time", move |_, payload| {
            sink.lock().push(payload.clone());
            Ok(())
        });

        let (_connection, ready_rx) = Connection::spawn(transport, events, 10);
        let sender = host.sender();
        sender.event("time", json!("12:00")).expect("event");
        sender.ready(ReadyData::default()).expect("ready");
        ready_rx.await.expect("ready");

        assert_eq!(*seen.lock(), vec![json!("12:00")]);
    }

    #[tokio::test]
    async fn test_timeout_removes_correlation() {
        let (transport, mut host) = channel::pair();
        let (connection, _ready) = Connection::spawn(transport, EventBus::new(), 10);

        let result = connection
            .send_with_timeout(invoke("slow", Value::Null), Duration::from_millis(20))
            .await;

        assert!(matches!(result, Err(Error::RequestTimeout { ref command, .. }) if command == "slow"));

        // A late answer must not resurrect the entry.
        let Some(Ok(frame)) = host.recv().await else {
            panic!("expected frame");
        };
        host.sender()
            .respond(Response::success(frame.id(), Value::Null))
            .expect("respond");

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(connection.pending_count(), 0);
        assert!(!connection.is_closed());
    }

    #[tokio::test]
    async fn test_pending_limit() {
        let (transport, mut host) = channel::pair();
        let (connection, _ready) = Connection::spawn(transport, EventBus::new(), 1);

        let first = tokio::spawn({
            let connection = connection.clone();
            async move { connection.send(invoke("hold", Value::Null)).await }
        });

        // Wait until the first call is registered.
        let Some(Ok(frame)) = host.recv().await else {
            panic!("expected frame");
        };

        let second = connection.send(invoke("extra", Value::Null)).await;
        assert!(matches!(second, Err(Error::TooManyPending { pending: 1, max: 1 })));

        host.sender()
            .respond(Response::success(frame.id(), Value::Null))
            .expect("respond");
        first.await.expect("join").expect("first call");
    }

    #[tokio::test]
    async fn test_pending_limit_holds_under_burst() {
        let (transport, mut host) = channel::pair();
        let (connection, _ready) = Connection::spawn(transport, EventBus::new(), 1);

        // Spawned together, before the event loop registers any of them.
        let calls: Vec<_> = (0..5)
            .map(|i| {
                let connection = connection.clone();
                tokio::spawn(async move {
                    connection
                        .send_with_timeout(
                            invoke(&format!("burst-{i}"), Value::Null),
                            Duration::from_millis(100),
                        )
                        .await
                })
            })
            .collect();

        let mut rejected = 0;
        let mut timed_out = 0;
        for call in calls {
            match call.await.expect("join") {
                Err(Error::TooManyPending { max: 1, .. }) => rejected += 1,
                Err(Error::RequestTimeout { .. }) => timed_out += 1,
                other => panic!("unexpected result: {other:?}"),
            }
        }
        assert_eq!((rejected, timed_out), (4, 1));

        let mut frames = 0;
        while let Ok(Some(_)) = tokio::time::timeout(Duration::from_millis(20), host.recv()).await {
            frames += 1;
        }
        assert_eq!(frames, 1);
        assert_eq!(connection.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_slot_released_after_timeout() {
        let (transport, _host) = channel::pair();
        let (connection, _ready) = Connection::spawn(transport, EventBus::new(), 1);

        for _ in 0..2 {
            let result = connection
                .send_with_timeout(invoke("slow", Value::Null), Duration::from_millis(10))
                .await;
            assert!(matches!(result, Err(Error::RequestTimeout { .. })));
        }
        assert_eq!(connection.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_fails_pending_calls() {
        let (transport, mut host) = channel::pair();
        let (connection, _ready) = Connection::spawn(transport, EventBus::new(), 10);

        let call = tokio::spawn({
            let connection = connection.clone();
            async move {
                connection
                    .send(ClientFrame::Emit(EmitRequest::new("ping", json!(42))))
                    .await
            }
        });

        let _ = host.recv().await;
        connection.shutdown();

        let result = call.await.expect("join");
        assert!(matches!(result, Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_host_disconnect_fails_pending_calls() {
        let (transport, mut host) = channel::pair();
        let (connection, _ready) = Connection::spawn(transport, EventBus::new(), 10);

        let call = tokio::spawn({
            let connection = connection.clone();
            async move { connection.send(invoke("greet", Value::Null)).await }
        });

        let _ = host.recv().await;
        drop(host);

        let result = call.await.expect("join");
        assert!(matches!(result, Err(Error::ConnectionClosed)));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(connection.is_closed());
    }
}
