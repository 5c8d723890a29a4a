//! Listening endpoint for hosts that dial in.
//!
//! Some hosts prefer to connect to the bridge rather than be dialed. The
//! bridge binds a local port, hands [`HostListener::ws_url`] to the host,
//! and waits for it to connect.
//!
//! # Connection Flow
//!
//! 1. Bridge binds to `localhost:0` (random port)
//! 2. URL is passed to the host (command line, environment, init script)
//! 3. Host connects and upgrades to WebSocket
//! 4. Host sends a `ready` frame
//! 5. Binding resolved, ready for invoke/emit

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time::{Instant, timeout};
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::{Transport, websocket};

// ============================================================================
// HostListener
// ============================================================================

/// A WebSocket endpoint that is bound but not yet connected.
///
/// # Example
///
/// ```ignore
/// use std::net::{IpAddr, Ipv4Addr};
/// use webview_bridge::transport::HostListener;
///
/// let listener = HostListener::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0).await?;
/// let url = listener.ws_url();
///
/// // Hand url to the host...
///
/// let ready = bridge.accept(listener).await?;
/// ```
pub struct HostListener {
    /// TCP listener for the incoming host connection.
    listener: TcpListener,
    /// Address the listener is bound to.
    addr: SocketAddr,
}

impl HostListener {
    /// Binds to the specified address and port.
    ///
    /// Use port 0 to let the OS assign a random available port.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn bind(ip: IpAddr, port: u16) -> Result<Self> {
        let listener = TcpListener::bind(SocketAddr::new(ip, port)).await?;
        let addr = listener.local_addr()?;

        debug!(%addr, "Host listener bound");

        Ok(Self { listener, addr })
    }

    /// Returns the port the listener is bound to.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Returns the bound socket address.
    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the WebSocket URL the host should dial.
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Waits for the host to connect and upgrades to WebSocket.
    ///
    /// # Errors
    ///
    /// - [`Error::BindingUnavailable`] if the host doesn't connect and
    ///   upgrade within `wait`
    /// - [`Error::Connection`] if the WebSocket upgrade fails
    pub async fn accept(self, wait: Duration) -> Result<Transport> {
        let started = Instant::now();
        let unavailable = || Error::binding_unavailable(wait.as_millis() as u64);

        let (stream, peer) = timeout(wait, self.listener.accept())
            .await
            .map_err(|_| unavailable())??;

        debug!(%peer, "Host TCP connection accepted");

        let remaining = wait.saturating_sub(started.elapsed());
        let ws_stream = timeout(remaining, tokio_tungstenite::accept_async(stream))
            .await
            .map_err(|_| {
                debug!(%peer, "Host never completed the WebSocket upgrade");
                unavailable()
            })?
            .map_err(|e| Error::connection(format!("WebSocket upgrade failed: {e}")))?;

        info!(port = self.port(), "Host WebSocket connection established");

        Ok(websocket::from_stream(ws_stream))
    }
}

impl std::fmt::Debug for HostListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostListener")
            .field("addr", &self.addr)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn test_bind_random_port() {
        let listener = HostListener::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
            .await
            .expect("bind should succeed");

        assert!(listener.port() > 0);
        assert_eq!(listener.ws_url(), format!("ws://127.0.0.1:{}", listener.port()));
        assert_eq!(listener.local_addr().ip(), IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[tokio::test]
    async fn test_accept_times_out_without_host() {
        let listener = HostListener::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
            .await
            .expect("bind should succeed");

        let result = listener.accept(Duration::from_millis(20)).await;
        assert!(matches!(
            result,
            Err(Error::BindingUnavailable { timeout_ms: 20 })
        ));
    }

    #[tokio::test]
    async fn test_accept_times_out_on_silent_peer() {
        let listener = HostListener::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
            .await
            .expect("bind should succeed");

        // Connects over TCP but never sends the upgrade request.
        let addr = listener.local_addr();
        let peer = tokio::spawn(async move {
            let socket = tokio::net::TcpStream::connect(addr).await.expect("connect");
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let result = timeout(Duration::from_secs(2), listener.accept(Duration::from_millis(100)))
            .await
            .expect("accept must honour its wait");

        assert!(matches!(
            result,
            Err(Error::BindingUnavailable { timeout_ms: 100 })
        ));
        peer.abort();
    }
}
