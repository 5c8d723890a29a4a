//! Scripted host for tests.
//!
//! Answers invoke frames from registered closures and acknowledges emits,
//! optionally relaying each emitted event back the way an echoing host
//! would.

use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::bridge::{Bridge, BridgeOptions};
use crate::protocol::{ClientFrame, HostFailure, ReadyData, Response};
use crate::transport::{HostEndpoint, HostSender, channel};

/// Command implementation.
type CommandHandler = Box<dyn Fn(Value) -> Result<Value, HostFailure> + Send + Sync>;

/// In-process fake of the native host.
pub(crate) struct FakeHost {
    commands: FxHashMap<String, CommandHandler>,
    echo_events: bool,
    rejected_events: Vec<String>,
    ready: ReadyData,
}

impl FakeHost {
    pub(crate) fn new() -> Self {
        Self {
            commands: FxHashMap::default(),
            echo_events: false,
            rejected_events: Vec::new(),
            ready: ReadyData::for_window("main"),
        }
    }

    /// Registers a command.
    pub(crate) fn command<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(Value) -> Result<Value, HostFailure> + Send + Sync + 'static,
    {
        self.commands.insert(name.to_string(), Box::new(handler));
        self
    }

    /// Relays each emitted event back before acknowledging it.
    pub(crate) fn echo_events(mut self, echo: bool) -> Self {
        self.echo_events = echo;
        self
    }

    /// Answers emits of `event` with an error ack.
    pub(crate) fn reject_event(mut self, event: &str) -> Self {
        self.rejected_events.push(event.to_string());
        self
    }

    /// Signals ready and serves frames until the client goes away.
    pub(crate) fn serve(self, mut endpoint: HostEndpoint) -> JoinHandle<()> {
        let sender = endpoint.sender();

        tokio::spawn(async move {
            if sender.ready(self.ready.clone()).is_err() {
                return;
            }

            while let Some(frame) = endpoint.recv().await {
                let response = match frame {
                    Ok(ClientFrame::Invoke(request)) => match self.commands.get(&request.command) {
                        Some(handler) => match handler(request.args) {
                            Ok(data) => Response::success(request.id, data),
                            Err(failure) => Response::error(request.id, failure),
                        },
                        None => Response::error(
                            request.id,
                            HostFailure::message(format!("Command {} not found", request.command)),
                        ),
                    },

                    Ok(ClientFrame::Emit(request)) => {
                        if self.rejected_events.contains(&request.event) {
                            Response::error(
                                request.id,
                                HostFailure::message(format!("Event {} rejected", request.event)),
                            )
                        } else {
                            if self.echo_events {
                                let _ = sender.event(request.event.clone(), request.data);
                            }
                            Response::success(request.id, Value::Null)
                        }
                    }

                    Err(_) => continue,
                };

                if sender.respond(response).is_err() {
                    break;
                }
            }
        })
    }
}

/// Builds a bridge attached to `host` over a channel transport.
///
/// Returns the host's sender so tests can push events.
pub(crate) async fn bridge_with_host(host: FakeHost, options: BridgeOptions) -> (Bridge, HostSender) {
    let bridge = Bridge::builder().options(options).build().expect("valid options");
    let (transport, endpoint) = channel::pair();
    let sender = endpoint.sender();

    host.serve(endpoint);
    bridge.attach(transport).await.expect("attach");

    (bridge, sender)
}
