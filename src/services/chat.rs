//! Chat service: room membership, message posting and history.
//!
//! DESIGN
//! ======
//! The server is the single source of truth for message order, ids, and
//! timestamps. A posted message is validated, stored, then broadcast as
//! `receive_message` to every joined client including the sender; clients
//! never append their own messages locally.
//!
//! IDENTITY
//! ========
//! Each connection gets a guest nickname on connect. An authenticated
//! connection's messages carry the user id the connection announced, never
//! the one in the payload. Guests always post with `userId = null` under
//! their assigned guest nickname, and nobody else may use that namespace:
//! clients recognise their own guest messages by it.

use frames::{ChatMessage, OutgoingMessage, ServerEvent, UserId};
use rand::Rng;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ErrorCode;
use crate::rate_limit::RateLimitError;
use crate::services::notify::Notification;
use crate::services::store::{NewMessage, StoreError};
use crate::state::{AppState, ConnectedClient};

/// Prefix of server-assigned guest nicknames ("anonymous").
pub const GUEST_NICKNAME_PREFIX: &str = "익명";

/// Longest accepted nickname, in characters.
pub const MAX_NICKNAME_LEN: usize = 30;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message required")]
    EmptyMessage,
    #[error("message exceeds {max} characters")]
    TooLong { max: usize },
    #[error("must join the chat first")]
    NotJoined,
    #[error("nicknames starting with 익명 are reserved for guests")]
    ReservedNickname,
    #[error(transparent)]
    RateLimited(#[from] RateLimitError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ErrorCode for ChatError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyMessage => "E_EMPTY_MESSAGE",
            Self::TooLong { .. } => "E_MESSAGE_TOO_LONG",
            Self::NotJoined => "E_NOT_JOINED",
            Self::ReservedNickname => "E_RESERVED_NICKNAME",
            Self::RateLimited(e) => e.error_code(),
            Self::Store(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::RateLimited(e) => e.retryable(),
            Self::Store(e) => e.retryable(),
            _ => false,
        }
    }
}

/// Who is posting: what the websocket layer knows about the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub client_id: Uuid,
    pub user_id: Option<UserId>,
    pub guest_nickname: String,
}

// =============================================================================
// IDENTITY
// =============================================================================

/// Generate a guest nickname such as `익명42`.
#[must_use]
pub fn guest_nickname() -> String {
    let n: u16 = rand::rng().random_range(1..=9999);
    format!("{GUEST_NICKNAME_PREFIX}{n}")
}

/// Pick the nickname stored with a message.
///
/// Guests always post under their assigned guest nickname. A signed-in user
/// may pick any nickname outside the guest namespace; a blank one falls back
/// to the connection's guest nickname.
///
/// # Errors
///
/// Returns [`ChatError::ReservedNickname`] when a signed-in user asks for a
/// nickname starting with [`GUEST_NICKNAME_PREFIX`].
pub fn resolve_nickname(sender: &Sender, requested: &str) -> Result<String, ChatError> {
    let trimmed = requested.trim();
    if sender.user_id.is_none() || trimmed.is_empty() {
        return Ok(sender.guest_nickname.clone());
    }
    if trimmed.starts_with(GUEST_NICKNAME_PREFIX) {
        return Err(ChatError::ReservedNickname);
    }
    Ok(trimmed.chars().take(MAX_NICKNAME_LEN).collect())
}

/// Trim and bound a message body.
///
/// # Errors
///
/// Returns [`ChatError::EmptyMessage`] for blank text and
/// [`ChatError::TooLong`] above `max_len` characters.
pub fn validate_message(text: &str, max_len: usize) -> Result<String, ChatError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ChatError::EmptyMessage);
    }
    if trimmed.chars().count() > max_len {
        return Err(ChatError::TooLong { max: max_len });
    }
    Ok(trimmed.to_owned())
}

// =============================================================================
// ROOM MEMBERSHIP
// =============================================================================

/// Add (or refresh) a client in the room.
pub async fn join(state: &AppState, client_id: Uuid, client: ConnectedClient) {
    let room_size = {
        let mut room = state.room.write().await;
        room.clients.insert(client_id, client);
        room.clients.len()
    };
    info!(%client_id, room_size, "chat: client joined");
}

/// Record a late `authenticate` on a client that already joined.
pub async fn set_user(state: &AppState, client_id: Uuid, user_id: UserId) {
    let mut room = state.room.write().await;
    if let Some(client) = room.clients.get_mut(&client_id) {
        client.user_id = Some(user_id);
    }
}

/// Remove a client from the room and forget its rate-limit window.
pub async fn part(state: &AppState, client_id: Uuid) {
    let removed = state.room.write().await.clients.remove(&client_id).is_some();
    state.rate_limiter.forget(client_id);
    if removed {
        info!(%client_id, "chat: client left");
    }
}

/// Whether the client is currently in the room.
pub async fn is_joined(state: &AppState, client_id: Uuid) -> bool {
    state.room.read().await.clients.contains_key(&client_id)
}

// =============================================================================
// MESSAGES
// =============================================================================

/// Validate, store, and broadcast a message. Returns the stored message.
///
/// # Errors
///
/// Returns a [`ChatError`] when the sender has not joined, is rate limited,
/// sent an empty or over-long body, asked for a reserved nickname, or the
/// store fails.
pub async fn post_message(
    state: &AppState,
    sender: &Sender,
    outgoing: OutgoingMessage,
) -> Result<ChatMessage, ChatError> {
    if !is_joined(state, sender.client_id).await {
        return Err(ChatError::NotJoined);
    }
    let message = validate_message(&outgoing.message, state.limits.max_message_len)?;
    let nick_name = resolve_nickname(sender, &outgoing.nick_name)?;
    state.rate_limiter.check_and_record(sender.client_id)?;

    if outgoing.user_id.is_some() && outgoing.user_id != sender.user_id {
        warn!(
            client_id = %sender.client_id,
            claimed = ?outgoing.user_id,
            actual = ?sender.user_id,
            "chat: payload userId ignored"
        );
    }

    let new = NewMessage { user_id: sender.user_id, nick_name, message };
    let (stored, room_size) = {
        // Held across insert and broadcast so live order matches history order.
        let _order = state.post_lock.lock().await;
        let stored = state.store.insert(new).await?;
        let room_size = broadcast(state, &ServerEvent::ReceiveMessage(stored.clone())).await;
        (stored, room_size)
    };
    state
        .notifier
        .notify(&Notification::MessagePosted { message: stored.clone(), room_size })
        .await;

    Ok(stored)
}

/// Send an event to every joined client. Returns how many received it.
///
/// Clients whose channel is full or closed are skipped; a closed channel is
/// cleaned up when that connection's loop exits.
pub async fn broadcast(state: &AppState, event: &ServerEvent) -> usize {
    let room = state.room.read().await;
    let mut delivered = 0;
    for (client_id, client) in &room.clients {
        if client.tx.try_send(event.clone()).is_ok() {
            delivered += 1;
        } else {
            warn!(%client_id, event = event.name(), "chat: broadcast dropped");
        }
    }
    delivered
}

/// The most recent messages, oldest first.
///
/// # Errors
///
/// Returns a [`StoreError`] if the store read fails.
pub async fn history(state: &AppState) -> Result<Vec<ChatMessage>, StoreError> {
    state.store.recent(state.limits.history_limit).await
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
