//! WebSocket handler: the chat room's realtime channel.
//!
//! DESIGN
//! ======
//! On upgrade, generates a client ID and a guest nickname, then enters a
//! `select!` loop:
//! - Incoming client frames → decode + dispatch by event name
//! - Room broadcasts from the client's channel → forward to the socket
//!
//! Dispatch returns the events meant for the sender only (errors). Chat
//! messages reach the sender the same way they reach everyone else: through
//! the room broadcast.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → send `connect` with `clientId`, then `set_nickname`
//! 2. Client sends `authenticate` (optional) and `join_chat`
//! 3. `send_message` → validate, store, broadcast `receive_message`
//! 4. Close → leave the room

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use frames::{ClientEvent, CodecError, Frame, ServerEvent, UserId};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ErrorCode, error_event};
use crate::services::chat::{self, Sender};
use crate::state::{AppState, ConnectedClient};

/// Outgoing events buffered per client before broadcasts start dropping.
const CLIENT_CHANNEL_CAPACITY: usize = 256;

// =============================================================================
// CONNECTION
// =============================================================================

/// What the socket loop knows about its peer.
#[derive(Debug, Clone)]
struct Connection {
    client_id: Uuid,
    user_id: Option<UserId>,
    guest_nickname: String,
    joined: bool,
}

impl Connection {
    fn new(client_id: Uuid, guest_nickname: String) -> Self {
        Self { client_id, user_id: None, guest_nickname, joined: false }
    }

    fn sender(&self) -> Sender {
        Sender { client_id: self.client_id, user_id: self.user_id, guest_nickname: self.guest_nickname.clone() }
    }

    /// Events sent right after the upgrade.
    fn greeting(&self) -> [ServerEvent; 2] {
        [
            ServerEvent::Connected { client_id: self.client_id },
            ServerEvent::SetNickname { nick_name: self.guest_nickname.clone() },
        ]
    }
}

#[derive(Debug, thiserror::Error)]
enum InboundError {
    #[error("invalid frame: {0}")]
    Codec(#[from] CodecError),
    #[error("invalid json frame: {0}")]
    Json(#[from] serde_json::Error),
}

impl ErrorCode for InboundError {
    fn error_code(&self) -> &'static str {
        "E_BAD_FRAME"
    }
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let client_id = Uuid::new_v4();
    let mut conn = Connection::new(client_id, chat::guest_nickname());

    // Per-connection channel for receiving room broadcasts.
    let (client_tx, mut client_rx) = mpsc::channel::<ServerEvent>(CLIENT_CHANNEL_CAPACITY);

    for event in conn.greeting() {
        if send_event(&mut socket, &event).await.is_err() {
            return;
        }
    }

    info!(%client_id, nick_name = %conn.guest_nickname, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                let replies = match msg {
                    Message::Binary(bytes) => process_inbound_bytes(&state, &mut conn, &client_tx, &bytes).await,
                    Message::Text(text) => process_inbound_text(&state, &mut conn, &client_tx, text.as_str()).await,
                    Message::Close(_) => break,
                    _ => continue,
                };
                for event in replies {
                    let _ = send_event(&mut socket, &event).await;
                }
            }
            Some(event) = client_rx.recv() => {
                if send_event(&mut socket, &event).await.is_err() {
                    break;
                }
            }
        }
    }

    chat::part(&state, client_id).await;
    info!(%client_id, "ws: client disconnected");
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Decode one binary frame and dispatch it. Returns events for the sender.
async fn process_inbound_bytes(
    state: &AppState,
    conn: &mut Connection,
    client_tx: &mpsc::Sender<ServerEvent>,
    bytes: &[u8],
) -> Vec<ServerEvent> {
    match frames::decode_frame(bytes) {
        Ok(frame) => process_frame(state, conn, client_tx, &frame).await,
        Err(e) => reject(conn, &InboundError::from(e)),
    }
}

/// JSON text frames are accepted for debugging tools.
async fn process_inbound_text(
    state: &AppState,
    conn: &mut Connection,
    client_tx: &mpsc::Sender<ServerEvent>,
    text: &str,
) -> Vec<ServerEvent> {
    match serde_json::from_str::<Frame>(text) {
        Ok(frame) => process_frame(state, conn, client_tx, &frame).await,
        Err(e) => reject(conn, &InboundError::from(e)),
    }
}

async fn process_frame(
    state: &AppState,
    conn: &mut Connection,
    client_tx: &mpsc::Sender<ServerEvent>,
    frame: &Frame,
) -> Vec<ServerEvent> {
    let client_id = conn.client_id;
    let event = match ClientEvent::from_frame(frame) {
        Ok(event) => event,
        Err(e) => return reject(conn, &InboundError::from(e)),
    };

    info!(%client_id, id = %frame.id, event = %frame.event, "ws: recv frame");

    match event {
        ClientEvent::Authenticate { user_id } => {
            conn.user_id = Some(user_id);
            if conn.joined {
                chat::set_user(state, client_id, user_id).await;
            }
            info!(%client_id, user_id, "ws: client authenticated");
            vec![]
        }
        ClientEvent::JoinChat => {
            chat::join(state, client_id, ConnectedClient { tx: client_tx.clone(), user_id: conn.user_id }).await;
            conn.joined = true;
            vec![]
        }
        ClientEvent::SendMessage(outgoing) => match chat::post_message(state, &conn.sender(), outgoing).await {
            Ok(_) => vec![],
            Err(e) => reject(conn, &e),
        },
    }
}

fn reject(conn: &Connection, err: &(impl ErrorCode + ?Sized)) -> Vec<ServerEvent> {
    warn!(client_id = %conn.client_id, code = err.error_code(), error = %err, "ws: request rejected");
    vec![error_event(err)]
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_event(socket: &mut WebSocket, event: &ServerEvent) -> Result<(), axum::Error> {
    debug!(event = event.name(), "ws: send event");
    let bytes = frames::encode_frame(&event.to_frame());
    socket.send(Message::Binary(bytes.into())).await
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
