//! Websocket transport with automatic reconnect.
//!
//! ARCHITECTURE
//! ============
//! The transport is a spawned task that owns the socket. Server events are
//! translated into [`SessionEvent`]s and posted to the session's queue;
//! client events arrive on an unbounded channel and go out as binary
//! frames. A dropped connection posts `Disconnected`, waits, and dials
//! again with exponential backoff (reset after each successful connect).
//!
//! A `send_message` that never reached the wire, because the write failed
//! or it was still queued when the socket dropped, goes back to the session
//! as `SendFailed`. Other stale events are discarded: the session
//! re-announces itself on every `connect`.
//!
//! Aborting the task is the only way to stop it.

use std::time::Duration;

use frames::{ClientEvent, ServerEvent};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::session::SessionEvent;

// =============================================================================
// HANDLE
// =============================================================================

/// A running transport: the outgoing queue plus the task to abort.
#[derive(Debug)]
pub struct TransportHandle {
    outgoing: mpsc::UnboundedSender<ClientEvent>,
    task: JoinHandle<()>,
}

impl TransportHandle {
    #[must_use]
    pub fn new(outgoing: mpsc::UnboundedSender<ClientEvent>, task: JoinHandle<()>) -> Self {
        Self { outgoing, task }
    }

    /// Queue an event for the socket. Returns `false` once the task is gone.
    pub fn send(&self, event: ClientEvent) -> bool {
        self.outgoing.send(event).is_ok()
    }

    pub fn shutdown(self) {
        self.task.abort();
    }
}

/// Starts a transport that reports back on `events`.
pub trait Connector: Send + Sync {
    fn connect(&self, events: mpsc::Sender<SessionEvent>) -> TransportHandle;
}

// =============================================================================
// WEBSOCKET
// =============================================================================

pub struct WsConnector {
    config: ClientConfig,
}

impl WsConnector {
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }
}

impl Connector for WsConnector {
    fn connect(&self, events: mpsc::Sender<SessionEvent>) -> TransportHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(transport_loop(self.config.clone(), events, rx));
        TransportHandle::new(tx, task)
    }
}

/// Map a server event onto the session's input.
#[must_use]
pub fn session_event(event: ServerEvent) -> SessionEvent {
    match event {
        ServerEvent::Connected { client_id } => SessionEvent::Connected { client_id },
        ServerEvent::SetNickname { nick_name } => SessionEvent::NicknameAssigned(nick_name),
        ServerEvent::ReceiveMessage(message) => SessionEvent::MessageReceived(message),
        ServerEvent::Error { code, message } => SessionEvent::ServerRejected { code, message },
    }
}

/// Main connection loop with reconnect logic.
async fn transport_loop(
    config: ClientConfig,
    events: mpsc::Sender<SessionEvent>,
    mut outgoing: mpsc::UnboundedReceiver<ClientEvent>,
) {
    let url = match config.ws_url() {
        Ok(url) => url,
        Err(e) => {
            warn!(error = %e, "transport: cannot build websocket url");
            return;
        }
    };
    let mut backoff = config.reconnect_initial;

    loop {
        match connect_and_run(&url, &config, &mut backoff, &events, &mut outgoing).await {
            Ok(()) => info!(%url, "transport: disconnected"),
            Err(e) => warn!(%url, error = %e, "transport: connection failed"),
        }

        if events.send(SessionEvent::Disconnected).await.is_err() {
            return;
        }
        drain_unsent(&mut outgoing, &events).await;

        debug!(delay_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX), "transport: reconnecting");
        tokio::time::sleep(backoff).await;
        backoff = config.next_backoff(backoff);
    }
}

/// Connect to the websocket and pump frames until it drops.
async fn connect_and_run(
    url: &str,
    config: &ClientConfig,
    backoff: &mut Duration,
    events: &mpsc::Sender<SessionEvent>,
    outgoing: &mut mpsc::UnboundedReceiver<ClientEvent>,
) -> Result<(), ClientError> {
    let (stream, _) = connect_async(url).await?;
    *backoff = config.reconnect_initial;
    info!(%url, "transport: connected");

    drain_unsent(outgoing, events).await;

    let (mut write, mut read) = stream.split();
    loop {
        tokio::select! {
            msg = read.next() => {
                let Some(msg) = msg else { return Ok(()) };
                match msg? {
                    Message::Binary(bytes) => {
                        let event = match frames::decode_frame(&bytes).and_then(|f| ServerEvent::from_frame(&f)) {
                            Ok(event) => event,
                            Err(e) => {
                                warn!(error = %e, "transport: dropping undecodable frame");
                                continue;
                            }
                        };
                        debug!(event = event.name(), "transport: recv");
                        if events.send(session_event(event)).await.is_err() {
                            return Ok(());
                        }
                    }
                    Message::Close(_) => return Ok(()),
                    _ => {}
                }
            }
            Some(event) = outgoing.recv() => {
                debug!(event = event.name(), "transport: send");
                let bytes = frames::encode_frame(&event.to_frame());
                if let Err(e) = write.send(Message::Binary(bytes.into())).await {
                    report_unsent(events, event).await;
                    return Err(e.into());
                }
            }
        }
    }
}

/// Hand back whatever the previous connection left queued.
async fn drain_unsent(outgoing: &mut mpsc::UnboundedReceiver<ClientEvent>, events: &mpsc::Sender<SessionEvent>) {
    while let Ok(event) = outgoing.try_recv() {
        report_unsent(events, event).await;
    }
}

async fn report_unsent(events: &mpsc::Sender<SessionEvent>, event: ClientEvent) {
    match event {
        ClientEvent::SendMessage(message) => {
            warn!("transport: message not delivered");
            let _ = events.send(SessionEvent::SendFailed(message)).await;
        }
        other => debug!(event = other.name(), "transport: stale event dropped"),
    }
}

#[cfg(test)]
#[path = "transport_test.rs"]
mod tests;
