//! Completion notifications and the observer list that delivers them.
//!
//! Every public lobby operation finishes by emitting exactly one completion
//! event. Delivery is synchronous: by the time the operation returns, every
//! subscriber has seen its event. No lobby lock is held while subscribers
//! run, so a subscriber may call straight back into the lobby.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lanlobby_protocol::UniqueNetId;
use parking_lot::Mutex;
use tokio::sync::mpsc;

/// Outcome of [`join_session`](crate::LanSessionInterface::join_session).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinResult {
    Success,
    /// A session with that name is already in the registry.
    AlreadyInSession,
    UnknownError,
}

/// Something a lobby operation reports to its observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyEvent {
    CreateSessionComplete { session: String, success: bool },
    StartSessionComplete { session: String, success: bool },
    UpdateSessionComplete { session: String, success: bool },
    EndSessionComplete { session: String, success: bool },
    DestroySessionComplete { session: String, success: bool },
    JoinSessionComplete { session: String, result: JoinResult },
    RegisterPlayersComplete {
        session: String,
        players: Vec<UniqueNetId>,
        success: bool,
    },
    UnregisterPlayersComplete {
        session: String,
        players: Vec<UniqueNetId>,
        success: bool,
    },
    FindSessionsComplete { success: bool },
    CancelFindSessionsComplete { success: bool },
    /// A routed beacon had to use a fallback port. Whatever listens for
    /// game traffic should follow.
    PortChanged { port: u16 },
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Arc<dyn Fn(&LobbyEvent) + Send + Sync>;

/// An ordered list of observers.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<(SubscriptionId, Callback)>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an observer. Observers are called in subscription order.
    pub fn subscribe<C>(&self, callback: C) -> SubscriptionId
    where
        C: Fn(&LobbyEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.lock().push((id, Arc::new(callback)));
        id
    }

    /// Removes an observer. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    /// Forwards every event into an unbounded channel, for async consumers.
    ///
    /// The subscription lives until the receiver is dropped; after that,
    /// sends fail silently. Call [`unsubscribe`](Self::unsubscribe) with the
    /// returned id to detach it for good.
    pub fn subscribe_channel(&self) -> (SubscriptionId, mpsc::UnboundedReceiver<LobbyEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.subscribe(move |event| {
            let _ = tx.send(event.clone());
        });
        (id, rx)
    }

    pub fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delivers `event` to every observer.
    ///
    /// The list is snapshotted first, so observers may subscribe or
    /// unsubscribe from inside a callback.
    pub fn emit(&self, event: &LobbyEvent) {
        let snapshot: Vec<Callback> = self
            .subscribers
            .lock()
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        tracing::trace!(?event, observers = snapshot.len(), "emitting lobby event");
        for callback in snapshot {
            callback(event);
        }
    }

    pub(crate) fn emit_all(&self, events: Vec<LobbyEvent>) {
        for event in &events {
            self.emit(event);
        }
    }
}
