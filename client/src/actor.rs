//! Session actor: drives a [`ChatSession`] from an ordered event queue.
//!
//! DESIGN
//! ======
//! One tokio task owns the session. Transport events, history results and
//! user actions all enter the same `mpsc` queue and are reduced one at a
//! time, so the session never needs a lock. Effects are carried out here:
//! the transport is started on `Connect`, history is fetched on a spawned
//! task whose result is posted back to the queue, and view-facing effects
//! go out on the [`ViewCommand`] channel.
//!
//! The actor stops after `Unmounted`; results that arrive later have no
//! one to deliver to.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::history::HistorySource;
use crate::session::{ChatSession, Effect, SendRejection, SessionEvent, SessionView};
use crate::transport::{Connector, TransportHandle};

const EVENT_QUEUE_CAPACITY: usize = 256;

/// What a front end should do after an event was reduced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewCommand {
    /// The session changed; redraw from this snapshot.
    Render(SessionView),
    ScrollToBottom,
    Notice(SendRejection),
}

/// Outside collaborators the actor needs.
#[derive(Clone)]
pub struct SessionDeps {
    pub connector: Arc<dyn Connector>,
    pub history: Arc<dyn HistorySource>,
}

/// Handle held by the front end.
#[derive(Debug)]
pub struct SessionHandle {
    events: mpsc::Sender<SessionEvent>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Post an event to the session. Returns `false` once it has stopped.
    pub async fn send(&self, event: SessionEvent) -> bool {
        self.events.send(event).await.is_ok()
    }

    /// Sender for code that posts events on its own (e.g. a stdin reader).
    #[must_use]
    pub fn sender(&self) -> mpsc::Sender<SessionEvent> {
        self.events.clone()
    }

    /// Unmount and wait for the actor to finish tearing down.
    pub async fn unmount(self) {
        let _ = self.events.send(SessionEvent::Unmounted).await;
        let _ = self.task.await;
    }
}

/// Spawn the actor and mount the session.
///
/// Returns the handle and the stream of view commands.
#[must_use]
pub fn spawn_session(session: ChatSession, deps: SessionDeps) -> (SessionHandle, mpsc::UnboundedReceiver<ViewCommand>) {
    let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
    let (view_tx, view_rx) = mpsc::unbounded_channel();

    // Queue is empty, so this cannot fail for lack of capacity.
    let _ = events_tx.try_send(SessionEvent::Mounted);

    let actor = SessionActor { session, deps, events: events_tx.clone(), view: view_tx, transport: None };
    let task = tokio::spawn(actor.run(events_rx));
    (SessionHandle { events: events_tx, task }, view_rx)
}

struct SessionActor {
    session: ChatSession,
    deps: SessionDeps,
    events: mpsc::Sender<SessionEvent>,
    view: mpsc::UnboundedSender<ViewCommand>,
    transport: Option<TransportHandle>,
}

impl SessionActor {
    async fn run(mut self, mut rx: mpsc::Receiver<SessionEvent>) {
        while let Some(event) = rx.recv().await {
            debug!(?event, "session: event");
            for effect in self.session.handle(event) {
                self.apply(effect);
            }
            let _ = self.view.send(ViewCommand::Render(self.session.view()));
            if self.session.is_unmounted() {
                break;
            }
        }

        if let Some(transport) = self.transport.take() {
            transport.shutdown();
        }
        info!("session: stopped");
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Connect => {
                if self.transport.is_none() {
                    self.transport = Some(self.deps.connector.connect(self.events.clone()));
                }
            }
            Effect::FetchHistory => {
                let history = Arc::clone(&self.deps.history);
                let events = self.events.clone();
                tokio::spawn(async move {
                    let event = match history.fetch().await {
                        Ok(messages) => SessionEvent::HistoryLoaded(messages),
                        Err(e) => {
                            warn!(error = %e, "session: history fetch failed");
                            SessionEvent::HistoryFailed
                        }
                    };
                    let _ = events.send(event).await;
                });
            }
            Effect::Emit(event) => {
                let name = event.name();
                let sent = self.transport.as_ref().is_some_and(|t| t.send(event));
                if !sent {
                    warn!(event = name, "session: no transport, event dropped");
                }
            }
            Effect::ScrollToBottom => {
                let _ = self.view.send(ViewCommand::ScrollToBottom);
            }
            Effect::SendRejected(rejection) => {
                let _ = self.view.send(ViewCommand::Notice(rejection));
            }
            Effect::Disconnect => {
                if let Some(transport) = self.transport.take() {
                    transport.shutdown();
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "actor_test.rs"]
mod tests;
