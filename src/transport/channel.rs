//! In-process channel transport.
//!
//! Connects the bridge to a host running in the same process. The host
//! side holds a [`HostEndpoint`]: it reads [`ClientFrame`]s and writes
//! [`HostFrame`]s.
//!
//! # Example
//!
//! ```ignore
//! use webview_bridge::transport::channel;
//!
//! let (transport, mut host) = channel::pair();
//! let sender = host.sender();
//! sender.ready(ReadyData::for_window("main"))?;
//!
//! bridge.attach(transport).await?;
//! while let Some(frame) = host.recv().await {
//!     // answer frames...
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::protocol::{ClientFrame, EventMessage, HostFrame, ReadyData, Response};

use super::{FrameSink, FrameSource, Transport};

// ============================================================================
// Constructor
// ============================================================================

/// Creates a connected client transport and host endpoint.
#[must_use]
pub fn pair() -> (Transport, HostEndpoint) {
    let (client_tx, host_rx) = mpsc::unbounded_channel();
    let (host_tx, client_rx) = mpsc::unbounded_channel();

    let transport = Transport::new(
        ChannelSink {
            tx: Some(client_tx),
        },
        ChannelSource { rx: client_rx },
    );

    let endpoint = HostEndpoint {
        sender: HostSender { tx: host_tx },
        rx: host_rx,
    };

    (transport, endpoint)
}

// ============================================================================
// Client Halves
// ============================================================================

/// Client outbound half.
struct ChannelSink {
    tx: Option<mpsc::UnboundedSender<String>>,
}

#[async_trait]
impl FrameSink for ChannelSink {
    async fn send_frame(&mut self, text: String) -> Result<()> {
        let tx = self.tx.as_ref().ok_or(Error::ConnectionClosed)?;
        tx.send(text).map_err(|_| Error::ConnectionClosed)
    }

    async fn close(&mut self) -> Result<()> {
        self.tx = None;
        Ok(())
    }
}

/// Client inbound half.
struct ChannelSource {
    rx: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
impl FrameSource for ChannelSource {
    async fn next_frame(&mut self) -> Option<Result<String>> {
        self.rx.recv().await.map(Ok)
    }
}

// ============================================================================
// HostEndpoint
// ============================================================================

/// Host side of a channel transport.
pub struct HostEndpoint {
    sender: HostSender,
    rx: mpsc::UnboundedReceiver<String>,
}

impl HostEndpoint {
    /// Returns a cloneable sender for host frames.
    #[inline]
    #[must_use]
    pub fn sender(&self) -> HostSender {
        self.sender.clone()
    }

    /// Receives the next client frame.
    ///
    /// Returns `None` once the client side has closed. Frames that fail to
    /// parse are returned as errors.
    pub async fn recv(&mut self) -> Option<Result<ClientFrame>> {
        let text = self.rx.recv().await?;
        Some(ClientFrame::parse(&text))
    }

    /// Receives the next client frame as raw text.
    pub async fn recv_text(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}

// ============================================================================
// HostSender
// ============================================================================

/// Sends host frames to the client.
#[derive(Debug, Clone)]
pub struct HostSender {
    tx: mpsc::UnboundedSender<String>,
}

impl HostSender {
    /// Sends a host frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the client side has gone.
    pub fn send(&self, frame: &HostFrame) -> Result<()> {
        self.send_text(frame.to_text()?)
    }

    /// Sends raw frame text, valid or not.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the client side has gone.
    pub fn send_text(&self, text: impl Into<String>) -> Result<()> {
        self.tx
            .send(text.into())
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Signals readiness.
    pub fn ready(&self, data: ReadyData) -> Result<()> {
        self.send(&HostFrame::Ready(data))
    }

    /// Sends a response to an invoke or emit.
    pub fn respond(&self, response: Response) -> Result<()> {
        self.send(&HostFrame::Response(response))
    }

    /// Pushes a named event.
    pub fn event(&self, event: impl Into<String>, data: Value) -> Result<()> {
        self.send(&HostFrame::Event(EventMessage::new(event, data)))
    }

    /// Returns `true` if the client side has gone.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::InvokeRequest;
    use serde_json::json;

    #[tokio::test]
    async fn test_client_frames_reach_host() {
        let (transport, mut host) = pair();
        let (mut sink, _source) = transport.into_parts();

        let frame = ClientFrame::Invoke(InvokeRequest::new("greet", Value::Null));
        let text = serde_json::to_string(&frame).expect("serialize");
        sink.send_frame(text).await.expect("send");

        let received = host.recv().await.expect("frame").expect("parse");
        assert_eq!(received.id(), frame.id());
    }

    #[tokio::test]
    async fn test_host_frames_reach_client() {
        let (transport, host) = pair();
        let (_sink, mut source) = transport.into_parts();

        host.sender().event("time", json!("12:00")).expect("send");

        let text = source.next_frame().await.expect("frame").expect("ok");
        let frame = HostFrame::parse(&text).expect("parse");
        assert!(matches!(frame, HostFrame::Event(ref e) if e.event == "time"));
    }

    #[tokio::test]
    async fn test_closed_sink_rejects_frames() {
        let (transport, _host) = pair();
        let (mut sink, _source) = transport.into_parts();

        sink.close().await.expect("close");
        let result = sink.send_frame("{}".to_string()).await;
        assert!(matches!(result, Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_host_sees_client_close() {
        let (transport, mut host) = pair();
        drop(transport);

        assert!(host.recv().await.is_none());
        assert!(host.sender().is_closed());
    }
}
