// Connection lifecycle and reconnect scheduling
//
// Owns the transport session: connect, read frames into the session
// dispatcher, relay queued commands through a writer half, and reschedule
// after failures with capped-linear backoff. Transport and decode errors are
// contained here; they never propagate as failures to the caller.

use crate::config::SessionConfig;
use crate::protocol::Command;
use crate::session::Session;
use crate::types::{ConnectionState, TelemetryError, TelemetryResult};
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;

type LifecycleHandler = Box<dyn FnMut() + Send>;

/// Backoff policy for reconnect scheduling
///
/// Attempt `n` (1-based) waits `min(base_delay * n, max_delay)`. Once
/// `max_attempts` is exhausted the manager stays `Disconnected` until an
/// external reconnect is triggered; giving up is logged, not fatal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(2000),
            max_delay: Duration::from_millis(10000),
            max_attempts: 50,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before reconnect attempt `attempt` (1-based), or `None` once the
    /// attempt budget is exhausted
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }
        Some((self.base_delay * attempt).min(self.max_delay))
    }
}

/// Cheap handle for issuing commands to the stand
///
/// Sending is only permitted while `Connected`; otherwise `send` reports
/// non-delivery with `Ok(false)` and never blocks or panics. Invalid command
/// arguments are rejected before anything touches the wire.
#[derive(Clone)]
pub struct CommandSender {
    state: Arc<RwLock<ConnectionState>>,
    tx: mpsc::UnboundedSender<String>,
}

impl CommandSender {
    pub fn send(&self, command: &Command) -> TelemetryResult<bool> {
        let text = command.encode()?;

        if *self.state.read() != ConnectionState::Connected {
            log::warn!("Not connected; {} command not sent", command.name());
            return Ok(false);
        }

        Ok(self.tx.send(text).is_ok())
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    pub fn is_connected(&self) -> bool {
        *self.state.read() == ConnectionState::Connected
    }
}

/// Owns the transport and the lifecycle state machine
pub struct ConnectionManager {
    url: String,
    policy: ReconnectPolicy,
    state: Arc<RwLock<ConnectionState>>,
    cancel: CancellationToken,
    outgoing_tx: mpsc::UnboundedSender<String>,
    outgoing_rx: Option<mpsc::UnboundedReceiver<String>>,
    on_connect: Option<LifecycleHandler>,
    on_disconnect: Option<LifecycleHandler>,
}

impl ConnectionManager {
    pub fn new(config: &SessionConfig) -> Self {
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        Self {
            url: config.ws_url(),
            policy: config.reconnect,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            cancel: CancellationToken::new(),
            outgoing_tx,
            outgoing_rx: Some(outgoing_rx),
            on_connect: None,
            on_disconnect: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Handle for issuing commands from anywhere
    pub fn command_sender(&self) -> CommandSender {
        CommandSender {
            state: Arc::clone(&self.state),
            tx: self.outgoing_tx.clone(),
        }
    }

    /// Token for external cancellation; cancelling supersedes any scheduled
    /// reconnect timer
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Register the connect handler; replaces any previous one
    pub fn on_connect<F>(&mut self, handler: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.on_connect = Some(Box::new(handler));
    }

    /// Register the disconnect handler; replaces any previous one
    pub fn on_disconnect<F>(&mut self, handler: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.on_disconnect = Some(Box::new(handler));
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
    }

    /// Drive the connection until cancelled or the reconnect budget runs out.
    ///
    /// Returns the session so callers can inspect or export its state after
    /// shutdown.
    pub async fn run(mut self, mut session: Session) -> TelemetryResult<Session> {
        let mut rx = self
            .outgoing_rx
            .take()
            .ok_or(TelemetryError::ChannelClosed)?;
        let cancel = self.cancel.clone();
        let mut attempts: u32 = 0;

        loop {
            self.set_state(ConnectionState::Connecting);
            log::info!("Connecting to {}", self.url);

            match connect_async(self.url.as_str()).await {
                Ok((ws, _)) => {
                    attempts = 0;
                    self.set_state(ConnectionState::Connected);
                    log::info!("WebSocket connected");
                    if let Some(handler) = self.on_connect.as_mut() {
                        handler();
                    }

                    let (mut write, mut read) = ws.split();
                    let mut shutdown = false;

                    loop {
                        tokio::select! {
                            biased;

                            _ = cancel.cancelled() => {
                                log::info!("Session cancelled, closing connection");
                                let _ = write.close().await;
                                shutdown = true;
                                break;
                            }

                            outgoing = rx.recv() => match outgoing {
                                Some(text) => {
                                    if let Err(e) = write.send(Message::Text(text.into())).await {
                                        log::warn!("Send failed: {}", e);
                                        break;
                                    }
                                }
                                None => {
                                    shutdown = true;
                                    break;
                                }
                            },

                            incoming = read.next() => match incoming {
                                Some(Ok(Message::Text(text))) => session.handle_text(&text),
                                Some(Ok(Message::Close(frame))) => {
                                    log::info!("Connection closed by peer: {:?}", frame);
                                    break;
                                }
                                // Pings and pongs are handled by the library;
                                // the protocol has no binary frames
                                Some(Ok(_)) => {}
                                Some(Err(e)) => {
                                    log::warn!("WebSocket error: {}", e);
                                    break;
                                }
                                None => break,
                            },
                        }
                    }

                    self.set_state(ConnectionState::Disconnected);
                    if let Some(handler) = self.on_disconnect.as_mut() {
                        handler();
                    }

                    if shutdown {
                        return Ok(session);
                    }
                }
                Err(e) => {
                    log::warn!("Connection failed: {}", e);
                    self.set_state(ConnectionState::Disconnected);
                }
            }

            attempts += 1;
            match self.policy.delay_for(attempts) {
                Some(delay) => {
                    log::info!(
                        "Reconnecting in {} ms (attempt {})",
                        delay.as_millis(),
                        attempts
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => return Ok(session),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                None => {
                    log::warn!(
                        "Giving up after {} reconnect attempts; staying disconnected",
                        self.policy.max_attempts
                    );
                    return Ok(session);
                }
            }
        }
    }
}
