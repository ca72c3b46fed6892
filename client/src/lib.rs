//! Chat client for the site's live chat panel.
//!
//! ARCHITECTURE
//! ============
//! - [`session`]: the pure `ChatSession` reducer (unread counts, scroll
//!   anchoring, send gating, history merge)
//! - [`actor`]: a tokio task that owns one session and executes its effects
//! - [`transport`]: websocket connection with reconnect and backoff
//! - [`history`]: the one-shot history fetch
//!
//! A front end calls [`spawn_session`], forwards user actions as
//! [`SessionEvent`]s and renders the [`ViewCommand`]s it gets back.

pub mod actor;
pub mod config;
pub mod error;
pub mod history;
pub mod scroll;
pub mod session;
pub mod transport;

pub use actor::{SessionDeps, SessionHandle, ViewCommand, spawn_session};
pub use config::ClientConfig;
pub use error::ClientError;
pub use history::{HistorySource, HttpHistory};
pub use scroll::{SCROLL_ANCHOR_THRESHOLD_PX, ScrollMetrics};
pub use session::{
    ChatSession, ConnectionState, Effect, HistoryState, Identity, SendRejection, SessionEvent, SessionView,
};
pub use transport::{Connector, TransportHandle, WsConnector};
