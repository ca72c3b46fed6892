//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the message store, the notifier, and the single shared room:
//! the set of websocket clients that sent `join_chat`, each with the
//! sender half of its outgoing event channel.

use std::collections::HashMap;
use std::sync::Arc;

use frames::{ServerEvent, UserId};
use tokio::sync::{Mutex, RwLock, mpsc};
use uuid::Uuid;

use crate::config::ChatLimits;
use crate::rate_limit::RateLimiter;
use crate::services::notify::Notifier;
use crate::services::store::ChatStore;

// =============================================================================
// ROOM
// =============================================================================

/// A client that joined the room.
#[derive(Debug, Clone)]
pub struct ConnectedClient {
    /// Outgoing events for this client's websocket.
    pub tx: mpsc::Sender<ServerEvent>,
    /// Set once the client sent `authenticate`.
    pub user_id: Option<UserId>,
}

/// The one shared chat room.
#[derive(Debug, Default)]
pub struct RoomState {
    /// Joined clients: `client_id` -> outgoing channel.
    pub clients: HashMap<Uuid, ConnectedClient>,
}

impl RoomState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ChatStore>,
    pub notifier: Arc<dyn Notifier>,
    pub room: Arc<RwLock<RoomState>>,
    /// Serializes store-then-broadcast of posted messages.
    pub post_lock: Arc<Mutex<()>>,
    pub rate_limiter: RateLimiter,
    pub limits: ChatLimits,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn ChatStore>, notifier: Arc<dyn Notifier>, limits: ChatLimits) -> Self {
        Self {
            store,
            notifier,
            room: Arc::new(RwLock::new(RoomState::new())),
            post_lock: Arc::new(Mutex::new(())),
            rate_limiter: RateLimiter::new(limits.rate_limit, limits.rate_window),
            limits,
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use super::*;
    use crate::services::notify::test_helpers::RecordingNotifier;
    use crate::services::store::MemoryChatStore;

    /// Create a test `AppState` on the in-memory store with default limits.
    #[must_use]
    pub fn test_app_state() -> AppState {
        test_app_state_with_limits(ChatLimits::default())
    }

    #[must_use]
    pub fn test_app_state_with_limits(limits: ChatLimits) -> AppState {
        AppState::new(Arc::new(MemoryChatStore::new()), Arc::new(RecordingNotifier::default()), limits)
    }

    /// Create a test `AppState` and hand back the notifier for assertions.
    #[must_use]
    pub fn test_app_state_with_notifier() -> (AppState, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let state = AppState::new(Arc::new(MemoryChatStore::new()), notifier.clone(), ChatLimits::default());
        (state, notifier)
    }

    /// Put a client straight into the room and return its event receiver.
    pub async fn seed_client(state: &AppState, user_id: Option<UserId>) -> (Uuid, mpsc::Receiver<ServerEvent>) {
        let client_id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(32);
        state
            .room
            .write()
            .await
            .clients
            .insert(client_id, ConnectedClient { tx, user_id });
        (client_id, rx)
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
