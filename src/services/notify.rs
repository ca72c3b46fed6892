//! Notification dispatch for room activity.
//!
//! DESIGN
//! ======
//! The serving process constructs one [`Notifier`] and hands it to
//! `AppState`; the chat service calls it after a message is stored. Nothing
//! reaches for a process-wide handle, so delivery backends (push, email,
//! board alerts) plug in at startup and tests swap in a recorder.

use async_trait::async_trait;
use frames::ChatMessage;
use tracing::info;

/// Something worth telling people who are not watching the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A message was stored and broadcast to `room_size` joined clients.
    MessagePosted { message: ChatMessage, room_size: usize },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification);
}

/// Default notifier: records the event in the structured log only.
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, notification: &Notification) {
        match notification {
            Notification::MessagePosted { message, room_size } => {
                info!(
                    id = ?message.id,
                    user_id = ?message.user_id,
                    nick_name = %message.nick_name,
                    room_size,
                    "notify: chat message posted"
                );
            }
        }
    }
}
