//! Shared frame model and protobuf codec for the chat websocket.
//!
//! This crate owns the wire representation used by both the server and the
//! chat client. Every websocket binary message carries exactly one [`Frame`]:
//! a named event plus a JSON payload. The envelope is protobuf for compact
//! framing; the payload travels as an embedded JSON document so integer
//! fields such as `userId` survive the trip unchanged.
//!
//! Typed views over the six chat events live in [`events`].

pub mod events;

use std::time::{SystemTime, UNIX_EPOCH};

use prost::Message;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub use events::{ChatMessage, ClientEvent, OutgoingMessage, ServerEvent, UserId};

// =============================================================================
// EVENT NAMES
// =============================================================================

/// Server → client: the socket is live and carries the connection's id.
pub const EVENT_CONNECT: &str = "connect";

/// Server → client: guest nickname assigned to this connection.
pub const EVENT_SET_NICKNAME: &str = "set_nickname";

/// Server → client: a message was stored in the room.
pub const EVENT_RECEIVE_MESSAGE: &str = "receive_message";

/// Server → client: a request from this connection was rejected.
pub const EVENT_ERROR: &str = "error";

/// Client → server: announce the authenticated user id.
pub const EVENT_AUTHENTICATE: &str = "authenticate";

/// Client → server: join the shared room.
pub const EVENT_JOIN_CHAT: &str = "join_chat";

/// Client → server: post a message to the room.
pub const EVENT_SEND_MESSAGE: &str = "send_message";

// =============================================================================
// ERRORS
// =============================================================================

/// Error returned by [`decode_frame`] and the typed event conversions.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The raw bytes could not be decoded as a protobuf `WireFrame`.
    #[error("failed to decode protobuf frame: {0}")]
    Decode(#[from] prost::DecodeError),
    /// The embedded payload is not valid JSON, or does not fit the event.
    #[error("invalid frame payload: {0}")]
    Payload(#[from] serde_json::Error),
    /// The event name is not one this side of the protocol understands.
    #[error("unknown event: {0}")]
    UnknownEvent(String),
}

// =============================================================================
// FRAME
// =============================================================================

/// A single message on the realtime wire protocol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Unique identifier for this frame (UUID string).
    pub id: String,
    /// Milliseconds since the Unix epoch when the frame was created.
    pub ts: i64,
    /// Event name, e.g. `"send_message"`.
    pub event: String,
    /// Event payload. An event without a payload carries an empty object.
    pub data: Value,
}

impl Frame {
    /// Create a frame with a fresh id and the current timestamp.
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self { id: Uuid::new_v4().to_string(), ts: now_ms(), event: event.into(), data }
    }

    /// Create a frame with an empty object payload.
    pub fn empty(event: impl Into<String>) -> Self {
        Self::new(event, Value::Object(Map::new()))
    }
}

/// Current time as milliseconds since Unix epoch.
fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

// =============================================================================
// CODEC
// =============================================================================

/// Encode a frame into protobuf bytes.
#[must_use]
pub fn encode_frame(frame: &Frame) -> Vec<u8> {
    let wire = WireFrame {
        id: frame.id.clone(),
        ts: frame.ts,
        event: frame.event.clone(),
        // Serializing a `Value` into a Vec cannot fail.
        data: serde_json::to_vec(&frame.data).unwrap_or_default(),
    };

    let mut out = Vec::with_capacity(wire.encoded_len());
    wire.encode(&mut out).unwrap_or_default();
    out
}

/// Decode protobuf bytes into a frame.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed bytes and
/// [`CodecError::Payload`] when the embedded payload is not JSON.
pub fn decode_frame(bytes: &[u8]) -> Result<Frame, CodecError> {
    let wire = WireFrame::decode(bytes)?;
    let data = if wire.data.is_empty() {
        Value::Object(Map::new())
    } else {
        serde_json::from_slice(&wire.data)?
    };

    Ok(Frame { id: wire.id, ts: wire.ts, event: wire.event, data })
}

#[derive(Clone, PartialEq, Message)]
struct WireFrame {
    #[prost(string, tag = "1")]
    id: String,
    #[prost(int64, tag = "2")]
    ts: i64,
    #[prost(string, tag = "3")]
    event: String,
    #[prost(bytes = "vec", tag = "4")]
    data: Vec<u8>,
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
