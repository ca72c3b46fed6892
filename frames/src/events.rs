//! Typed chat events carried inside [`Frame`]s.
//!
//! The protocol has one shared room and six events. Client → server:
//! `authenticate`, `join_chat`, `send_message`. Server → client: `connect`,
//! `set_nickname`, `receive_message`, plus `error` for rejected requests.
//! JSON field names are camelCase on the wire.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    CodecError, EVENT_AUTHENTICATE, EVENT_CONNECT, EVENT_ERROR, EVENT_JOIN_CHAT, EVENT_RECEIVE_MESSAGE,
    EVENT_SEND_MESSAGE, EVENT_SET_NICKNAME, Frame,
};

/// Identifier of an authenticated site user.
pub type UserId = i64;

// =============================================================================
// MESSAGES
// =============================================================================

/// A chat message as stored by the server and shown in the log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Server-assigned once persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    /// `None` for guest senders.
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub nick_name: String,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The `send_message` envelope. The server assigns `id` and `createdAt`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub nick_name: String,
    pub message: String,
}

// =============================================================================
// CLIENT EVENTS
// =============================================================================

/// Events emitted by a chat client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientEvent {
    Authenticate { user_id: UserId },
    JoinChat,
    SendMessage(OutgoingMessage),
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthenticatePayload {
    user_id: UserId,
}

impl ClientEvent {
    /// Wire event name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Authenticate { .. } => EVENT_AUTHENTICATE,
            Self::JoinChat => EVENT_JOIN_CHAT,
            Self::SendMessage(_) => EVENT_SEND_MESSAGE,
        }
    }

    /// Wrap the event in a fresh frame.
    #[must_use]
    pub fn to_frame(&self) -> Frame {
        match self {
            Self::Authenticate { user_id } => {
                Frame::new(EVENT_AUTHENTICATE, to_value(&AuthenticatePayload { user_id: *user_id }))
            }
            Self::JoinChat => Frame::empty(EVENT_JOIN_CHAT),
            Self::SendMessage(msg) => Frame::new(EVENT_SEND_MESSAGE, to_value(msg)),
        }
    }

    /// Parse a frame received by the server.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnknownEvent`] for server-only or unknown event
    /// names and [`CodecError::Payload`] when the payload does not fit.
    pub fn from_frame(frame: &Frame) -> Result<Self, CodecError> {
        match frame.event.as_str() {
            EVENT_AUTHENTICATE => {
                let payload: AuthenticatePayload = serde_json::from_value(frame.data.clone())?;
                Ok(Self::Authenticate { user_id: payload.user_id })
            }
            EVENT_JOIN_CHAT => Ok(Self::JoinChat),
            EVENT_SEND_MESSAGE => Ok(Self::SendMessage(serde_json::from_value(frame.data.clone())?)),
            other => Err(CodecError::UnknownEvent(other.to_owned())),
        }
    }
}

// =============================================================================
// SERVER EVENTS
// =============================================================================

/// Events emitted by the chat server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServerEvent {
    Connected { client_id: Uuid },
    SetNickname { nick_name: String },
    ReceiveMessage(ChatMessage),
    Error { code: String, message: String },
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectPayload {
    client_id: Uuid,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NicknamePayload {
    nick_name: String,
}

#[derive(Serialize, Deserialize)]
struct ErrorPayload {
    code: String,
    message: String,
}

impl ServerEvent {
    /// Wire event name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected { .. } => EVENT_CONNECT,
            Self::SetNickname { .. } => EVENT_SET_NICKNAME,
            Self::ReceiveMessage(_) => EVENT_RECEIVE_MESSAGE,
            Self::Error { .. } => EVENT_ERROR,
        }
    }

    /// Wrap the event in a fresh frame.
    #[must_use]
    pub fn to_frame(&self) -> Frame {
        let data = match self {
            Self::Connected { client_id } => to_value(&ConnectPayload { client_id: *client_id }),
            Self::SetNickname { nick_name } => to_value(&NicknamePayload { nick_name: nick_name.clone() }),
            Self::ReceiveMessage(msg) => to_value(msg),
            Self::Error { code, message } => to_value(&ErrorPayload { code: code.clone(), message: message.clone() }),
        };
        Frame::new(self.name(), data)
    }

    /// Parse a frame received by a client.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnknownEvent`] for client-only or unknown event
    /// names and [`CodecError::Payload`] when the payload does not fit.
    pub fn from_frame(frame: &Frame) -> Result<Self, CodecError> {
        let data = frame.data.clone();
        match frame.event.as_str() {
            EVENT_CONNECT => {
                let payload: ConnectPayload = serde_json::from_value(data)?;
                Ok(Self::Connected { client_id: payload.client_id })
            }
            EVENT_SET_NICKNAME => {
                let payload: NicknamePayload = serde_json::from_value(data)?;
                Ok(Self::SetNickname { nick_name: payload.nick_name })
            }
            EVENT_RECEIVE_MESSAGE => Ok(Self::ReceiveMessage(serde_json::from_value(data)?)),
            EVENT_ERROR => {
                let payload: ErrorPayload = serde_json::from_value(data)?;
                Ok(Self::Error { code: payload.code, message: payload.message })
            }
            other => Err(CodecError::UnknownEvent(other.to_owned())),
        }
    }
}

/// Serialize a payload struct. Plain derived structs always serialize.
fn to_value<T: Serialize>(payload: &T) -> Value {
    serde_json::to_value(payload).unwrap_or(Value::Null)
}

#[cfg(test)]
#[path = "events_test.rs"]
mod tests;
