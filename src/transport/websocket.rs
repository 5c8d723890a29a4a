//! WebSocket transport.
//!
//! Wraps a [`WebSocketStream`] as a [`Transport`]. [`connect`] dials a
//! host-provided URL and keeps retrying while the host is still starting.
//!
//! Only text messages carry frames; binary, ping and pong messages are
//! skipped.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::{Instant, sleep, timeout};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, trace};
use url::Url;

use crate::error::{Error, Result};

use super::{FrameSink, FrameSource, Transport};

// ============================================================================
// Halves
// ============================================================================

/// Outbound half of a WebSocket transport.
struct WsSink<S> {
    write: SplitSink<WebSocketStream<S>, Message>,
}

#[async_trait]
impl<S> FrameSink for WsSink<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn send_frame(&mut self, text: String) -> Result<()> {
        self.write.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.write.close().await?;
        Ok(())
    }
}

/// Inbound half of a WebSocket transport.
struct WsSource<S> {
    read: SplitStream<WebSocketStream<S>>,
}

#[async_trait]
impl<S> FrameSource for WsSource<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn next_frame(&mut self) -> Option<Result<String>> {
        loop {
            match self.read.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),

                Ok(Message::Close(_)) => {
                    debug!("WebSocket closed by host");
                    return None;
                }

                Err(e) => return Some(Err(Error::WebSocket(e))),

                // Ignore Binary, Ping, Pong
                Ok(_) => {}
            }
        }
    }
}

// ============================================================================
// Constructors
// ============================================================================

/// Wraps an established WebSocket stream as a transport.
#[must_use]
pub fn from_stream<S>(stream: WebSocketStream<S>) -> Transport
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (write, read) = stream.split();
    Transport::new(WsSink { write }, WsSource { read })
}

/// Dials the host at `url`, retrying until `deadline` elapses.
///
/// The host may not be listening yet when the bridge starts, so refused
/// connections are retried every `retry_interval`.
///
/// # Errors
///
/// - [`Error::InvalidArgument`] if `url` is not a `ws://` or `wss://` URL
/// - [`Error::BindingUnavailable`] if no connection succeeds before `deadline`
pub async fn connect(url: &str, retry_interval: Duration, deadline: Duration) -> Result<Transport> {
    let url = parse_ws_url(url)?;
    let started = Instant::now();
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;

        // Bounds the TCP dial and the upgrade handshake together.
        let remaining = deadline.saturating_sub(started.elapsed());

        match timeout(remaining, tokio_tungstenite::connect_async(url.as_str())).await {
            Ok(Ok((stream, _response))) => {
                info!(%url, attempts, "WebSocket connection established");
                return Ok(from_stream(stream));
            }
            Ok(Err(e)) => {
                trace!(%url, attempts, error = %e, "Host not reachable yet");
            }
            Err(_) => {
                debug!(%url, attempts, "WebSocket handshake did not complete in time");
                return Err(Error::binding_unavailable(deadline.as_millis() as u64));
            }
        }

        if started.elapsed() + retry_interval > deadline {
            debug!(%url, attempts, "Giving up on host connection");
            return Err(Error::binding_unavailable(deadline.as_millis() as u64));
        }

        sleep(retry_interval).await;
    }
}

/// Validates a host URL.
fn parse_ws_url(url: &str) -> Result<Url> {
    let parsed =
        Url::parse(url).map_err(|e| Error::invalid_argument(format!("Invalid host URL {url}: {e}")))?;

    match parsed.scheme() {
        "ws" | "wss" => Ok(parsed),
        scheme => Err(Error::invalid_argument(format!(
            "Host URL must use ws:// or wss://, got {scheme}://"
        ))),
    }
}

// ============================================================================
// Tests
// ============================================================================
