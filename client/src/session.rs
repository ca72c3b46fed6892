//! Chat session state machine.
//!
//! DESIGN
//! ======
//! `ChatSession` is a pure reducer: every input (transport event, history
//! result, user action) is a [`SessionEvent`], and [`ChatSession::handle`]
//! mutates the session and returns the [`Effect`]s the driver must carry
//! out. Nothing here touches the network or a clock, so every rule below is
//! tested without a transport.
//!
//! LIFECYCLE
//! =========
//! `Idle → Mounted → Unmounted`. Mounting connects once and fetches
//! history once. Unmounting is terminal: every later event is ignored, so
//! late history results and late messages cannot resurrect the session.
//!
//! Connection state (`Disconnected → Connecting → Connected`) is orthogonal
//! to the panel (`Closed/Open`) and to terms (`Pending/Agreed`). Sending is
//! only permitted in `Connected × Open × Agreed`.
//!
//! HISTORY MERGE
//! =============
//! Live messages that arrive while a history fetch is outstanding are
//! buffered. When the history lands it replaces the log and the buffer is
//! appended after it, skipping any message whose `id` the history already
//! contains. A failed fetch flushes the buffer onto the current log.
//! Every replacement bumps `log_generation` so views know to redraw.
//!
//! UNDELIVERED SENDS
//! =================
//! Submitting clears the input as soon as the message is handed to the
//! transport. If the socket dies before the frame is written, the transport
//! hands the message back as `SendFailed`: a blank input gets the text back
//! and the view sees the same `Disconnected` notice as an offline submit.

use frames::{ChatMessage, ClientEvent, OutgoingMessage, UserId};
use uuid::Uuid;

use crate::scroll::ScrollMetrics;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Lifecycle {
    #[default]
    Idle,
    Mounted,
    Unmounted,
}

/// The signed-in site user, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    /// Chat nickname chosen on the site.
    pub nick_name: Option<String>,
    /// Account display name, used when no nickname is set.
    pub display_name: Option<String>,
}

impl Identity {
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self { user_id, nick_name: None, display_name: None }
    }

    #[must_use]
    pub fn with_nick_name(mut self, nick_name: impl Into<String>) -> Self {
        self.nick_name = Some(nick_name.into());
        self
    }

    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Nickname if set and non-blank, else display name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        [self.nick_name.as_deref(), self.display_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HistoryState {
    #[default]
    NotRequested,
    /// Fetch outstanding; live messages wait in `buffered`.
    Pending { buffered: Vec<ChatMessage> },
    Loaded,
    Failed,
}

/// Why a submit did not go out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendRejection {
    /// No live connection. The input is kept for a retry.
    Disconnected,
    PanelClosed,
    TermsNotAgreed,
    /// The server refused the message.
    Server { code: String, message: String },
}

/// Everything the session reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The chat UI mounted.
    Mounted,
    /// Transport `connect` event.
    Connected { client_id: Uuid },
    /// The transport lost its connection and is retrying.
    Disconnected,
    /// Login state changed; `None` means signed out.
    IdentityChanged(Option<Identity>),
    /// Transport `set_nickname` event.
    NicknameAssigned(String),
    HistoryLoaded(Vec<ChatMessage>),
    HistoryFailed,
    /// Transport `receive_message` event.
    MessageReceived(ChatMessage),
    /// Transport `error` event.
    ServerRejected { code: String, message: String },
    /// The transport lost a submitted message before writing it.
    SendFailed(OutgoingMessage),
    Submit,
    InputChanged(String),
    SetOpen(bool),
    Scrolled(ScrollMetrics),
    AgreeToTerms,
    /// The "new message" indicator was clicked.
    JumpToLatest,
    Unmounted,
}

/// Work the driver carries out on the session's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Start the transport (once per mount).
    Connect,
    FetchHistory,
    /// Send an event over the transport.
    Emit(ClientEvent),
    /// Move the viewport to the newest message.
    ScrollToBottom,
    SendRejected(SendRejection),
    /// Tear down the transport.
    Disconnect,
}

/// Read-only copy of the session for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub connection: ConnectionState,
    pub messages: Vec<ChatMessage>,
    /// Bumped each time history replaces `messages`.
    pub log_generation: u64,
    pub unread_count: u32,
    pub is_open: bool,
    pub has_agreed_to_terms: bool,
    pub new_message_indicator: bool,
    pub input: String,
    pub nick_name: Option<String>,
}

// =============================================================================
// SESSION
// =============================================================================

#[derive(Debug, Clone)]
pub struct ChatSession {
    lifecycle: Lifecycle,
    connection: ConnectionState,
    has_connected: bool,
    messages: Vec<ChatMessage>,
    log_generation: u64,
    unread_count: u32,
    is_open: bool,
    has_agreed_to_terms: bool,
    scroll_anchor: bool,
    new_message_indicator: bool,
    input: String,
    identity: Option<Identity>,
    guest_nickname: Option<String>,
    history: HistoryState,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self {
            lifecycle: Lifecycle::Idle,
            connection: ConnectionState::Disconnected,
            has_connected: false,
            messages: Vec::new(),
            log_generation: 0,
            unread_count: 0,
            is_open: false,
            has_agreed_to_terms: false,
            scroll_anchor: true,
            new_message_indicator: false,
            input: String::new(),
            identity: None,
            guest_nickname: None,
            history: HistoryState::NotRequested,
        }
    }
}

impl ChatSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a known identity, e.g. a session restored before mount.
    #[must_use]
    pub fn with_identity(identity: Identity) -> Self {
        Self { identity: Some(identity), ..Self::new() }
    }

    /// Apply one event and return the effects it requires.
    pub fn handle(&mut self, event: SessionEvent) -> Vec<Effect> {
        if self.lifecycle == Lifecycle::Unmounted {
            return Vec::new();
        }

        let mut effects = Vec::new();
        match event {
            SessionEvent::Mounted => self.mount(&mut effects),
            SessionEvent::Connected { .. } => self.connected(&mut effects),
            SessionEvent::Disconnected => {
                if self.lifecycle == Lifecycle::Mounted {
                    self.connection = ConnectionState::Disconnected;
                }
            }
            SessionEvent::IdentityChanged(identity) => self.identity_changed(identity, &mut effects),
            SessionEvent::NicknameAssigned(nick_name) => self.guest_nickname = Some(nick_name),
            SessionEvent::HistoryLoaded(messages) => self.history_loaded(messages, &mut effects),
            SessionEvent::HistoryFailed => self.history_failed(),
            SessionEvent::MessageReceived(message) => self.receive_message(message, &mut effects),
            SessionEvent::ServerRejected { code, message } => {
                effects.push(Effect::SendRejected(SendRejection::Server { code, message }));
            }
            SessionEvent::SendFailed(outgoing) => self.send_failed(outgoing, &mut effects),
            SessionEvent::Submit => self.submit(&mut effects),
            SessionEvent::InputChanged(text) => self.input = text,
            SessionEvent::SetOpen(open) => self.set_open(open, &mut effects),
            SessionEvent::Scrolled(metrics) => self.update_scroll_anchor(metrics),
            SessionEvent::AgreeToTerms => {
                self.has_agreed_to_terms = true;
                if self.is_open {
                    self.scroll_to_bottom(&mut effects);
                }
            }
            SessionEvent::JumpToLatest => self.scroll_to_bottom(&mut effects),
            SessionEvent::Unmounted => self.unmount(&mut effects),
        }
        effects
    }

    // -------------------------------------------------------------------------
    // connection
    // -------------------------------------------------------------------------

    fn mount(&mut self, effects: &mut Vec<Effect>) {
        if self.lifecycle != Lifecycle::Idle {
            return;
        }
        self.lifecycle = Lifecycle::Mounted;
        self.connection = ConnectionState::Connecting;
        self.history = HistoryState::Pending { buffered: Vec::new() };
        effects.extend([Effect::Connect, Effect::FetchHistory]);
    }

    fn connected(&mut self, effects: &mut Vec<Effect>) {
        if self.lifecycle != Lifecycle::Mounted {
            return;
        }
        let reconnect = self.has_connected;
        self.has_connected = true;
        self.connection = ConnectionState::Connected;

        if let Some(identity) = &self.identity {
            effects.push(Effect::Emit(ClientEvent::Authenticate { user_id: identity.user_id }));
        }
        effects.push(Effect::Emit(ClientEvent::JoinChat));

        // Messages sent while we were away only exist in the server's log.
        if reconnect && !matches!(self.history, HistoryState::Pending { .. }) {
            self.history = HistoryState::Pending { buffered: Vec::new() };
            effects.push(Effect::FetchHistory);
        }
    }

    fn identity_changed(&mut self, identity: Option<Identity>, effects: &mut Vec<Effect>) {
        let previous = self.identity.as_ref().map(|i| i.user_id);
        let next = identity.as_ref().map(|i| i.user_id);
        self.identity = identity;

        if self.connection == ConnectionState::Connected && next != previous {
            if let Some(user_id) = next {
                effects.push(Effect::Emit(ClientEvent::Authenticate { user_id }));
            }
        }
    }

    fn unmount(&mut self, effects: &mut Vec<Effect>) {
        let was_mounted = self.lifecycle == Lifecycle::Mounted;
        self.lifecycle = Lifecycle::Unmounted;
        self.connection = ConnectionState::Disconnected;
        if let HistoryState::Pending { .. } = self.history {
            self.history = HistoryState::NotRequested;
        }
        if was_mounted {
            effects.push(Effect::Disconnect);
        }
    }

    // -------------------------------------------------------------------------
    // history
    // -------------------------------------------------------------------------

    fn history_loaded(&mut self, messages: Vec<ChatMessage>, effects: &mut Vec<Effect>) {
        let HistoryState::Pending { buffered } = std::mem::replace(&mut self.history, HistoryState::Loaded) else {
            return;
        };
        self.messages = messages;
        self.log_generation = self.log_generation.wrapping_add(1);
        for message in buffered {
            let duplicate = message.id.is_some() && self.messages.iter().any(|m| m.id == message.id);
            if !duplicate {
                self.messages.push(message);
            }
        }
        if self.is_open && self.has_agreed_to_terms {
            self.scroll_to_bottom(effects);
        }
    }

    fn history_failed(&mut self) {
        let HistoryState::Pending { buffered } = std::mem::replace(&mut self.history, HistoryState::Failed) else {
            return;
        };
        self.messages.extend(buffered);
    }

    // -------------------------------------------------------------------------
    // messages
    // -------------------------------------------------------------------------

    fn receive_message(&mut self, message: ChatMessage, effects: &mut Vec<Effect>) {
        let own = self.is_own(&message);

        match &mut self.history {
            HistoryState::Pending { buffered } => buffered.push(message),
            _ => self.messages.push(message),
        }

        if !self.is_open && !own {
            self.unread_count = self.unread_count.saturating_add(1);
        }

        if own {
            self.scroll_to_bottom(effects);
        } else if self.is_open {
            if self.scroll_anchor {
                effects.push(Effect::ScrollToBottom);
            } else {
                self.new_message_indicator = true;
            }
        }
    }

    fn submit(&mut self, effects: &mut Vec<Effect>) {
        let text = self.input.trim();
        if text.is_empty() {
            return;
        }

        let rejection = if self.connection != ConnectionState::Connected {
            Some(SendRejection::Disconnected)
        } else if !self.is_open {
            Some(SendRejection::PanelClosed)
        } else if !self.has_agreed_to_terms {
            Some(SendRejection::TermsNotAgreed)
        } else {
            None
        };
        if let Some(rejection) = rejection {
            effects.push(Effect::SendRejected(rejection));
            return;
        }

        let outgoing = OutgoingMessage {
            user_id: self.identity.as_ref().map(|i| i.user_id),
            nick_name: self.nick_name().unwrap_or_default().to_owned(),
            message: text.to_owned(),
        };
        self.input.clear();
        effects.push(Effect::Emit(ClientEvent::SendMessage(outgoing)));
    }

    fn send_failed(&mut self, outgoing: OutgoingMessage, effects: &mut Vec<Effect>) {
        // Never overwrite a newer draft.
        if self.input.trim().is_empty() {
            self.input = outgoing.message;
        }
        effects.push(Effect::SendRejected(SendRejection::Disconnected));
    }

    /// Whether `message` was sent by the current identity.
    ///
    /// Signed in: same user id. Guest: a guest message carrying our
    /// assigned nickname.
    #[must_use]
    pub fn is_own(&self, message: &ChatMessage) -> bool {
        match &self.identity {
            Some(identity) => message.user_id == Some(identity.user_id),
            None => {
                message.user_id.is_none() && self.guest_nickname.as_deref() == Some(message.nick_name.as_str())
            }
        }
    }

    // -------------------------------------------------------------------------
    // panel and scrolling
    // -------------------------------------------------------------------------

    fn set_open(&mut self, open: bool, effects: &mut Vec<Effect>) {
        self.is_open = open;
        if open {
            self.unread_count = 0;
            if self.has_agreed_to_terms {
                self.scroll_to_bottom(effects);
            }
        }
    }

    fn update_scroll_anchor(&mut self, metrics: ScrollMetrics) {
        self.scroll_anchor = metrics.is_anchored();
        if self.scroll_anchor {
            self.new_message_indicator = false;
        }
    }

    fn scroll_to_bottom(&mut self, effects: &mut Vec<Effect>) {
        self.scroll_anchor = true;
        self.new_message_indicator = false;
        effects.push(Effect::ScrollToBottom);
    }

    // -------------------------------------------------------------------------
    // accessors
    // -------------------------------------------------------------------------

    /// Name attached to outgoing messages: the identity's name, else the
    /// guest nickname.
    #[must_use]
    pub fn nick_name(&self) -> Option<&str> {
        self.identity
            .as_ref()
            .and_then(Identity::name)
            .or(self.guest_nickname.as_deref())
    }

    #[must_use]
    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[must_use]
    pub fn log_generation(&self) -> u64 {
        self.log_generation
    }

    #[must_use]
    pub fn unread_count(&self) -> u32 {
        self.unread_count
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.is_open
    }

    #[must_use]
    pub fn has_agreed_to_terms(&self) -> bool {
        self.has_agreed_to_terms
    }

    #[must_use]
    pub fn is_anchored(&self) -> bool {
        self.scroll_anchor
    }

    #[must_use]
    pub fn new_message_indicator(&self) -> bool {
        self.new_message_indicator
    }

    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    #[must_use]
    pub fn guest_nickname(&self) -> Option<&str> {
        self.guest_nickname.as_deref()
    }

    #[must_use]
    pub fn history(&self) -> &HistoryState {
        &self.history
    }

    #[must_use]
    pub fn is_unmounted(&self) -> bool {
        self.lifecycle == Lifecycle::Unmounted
    }

    #[must_use]
    pub fn view(&self) -> SessionView {
        SessionView {
            connection: self.connection,
            messages: self.messages.clone(),
            log_generation: self.log_generation,
            unread_count: self.unread_count,
            is_open: self.is_open,
            has_agreed_to_terms: self.has_agreed_to_terms,
            new_message_indicator: self.new_message_indicator,
            input: self.input.clone(),
            nick_name: self.nick_name().map(ToOwned::to_owned),
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
