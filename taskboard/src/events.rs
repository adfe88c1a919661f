//! Board event bus.
//!
//! Decouples whoever learns that the remote list changed (the push channel,
//! a successful local mutation) from the cache that must refetch. Backed by
//! a [`tokio::sync::broadcast`] channel so several listeners can observe the
//! same stream.

use tokio::sync::broadcast;

/// Default number of events buffered per subscriber.
pub const DEFAULT_BUS_CAPACITY: usize = 64;

/// Why the task list should be refetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationSource {
    /// The backend emitted `tasksUpdated`.
    Push,
    /// This client completed a mutation.
    LocalMutation,
    /// First load, or the push channel reconnected and may have missed events.
    Startup,
}

impl std::fmt::Display for InvalidationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Push => write!(f, "push"),
            Self::LocalMutation => write!(f, "local"),
            Self::Startup => write!(f, "startup"),
        }
    }
}

/// Events carried on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardEvent {
    /// The cached list is stale and must be replaced.
    Invalidate {
        /// What triggered the invalidation.
        source: InvalidationSource,
    },
    /// The cache finished replacing its snapshot.
    Refreshed {
        /// Cache generation after the replace.
        generation: u64,
        /// Number of tasks in the new snapshot.
        task_count: usize,
    },
}

/// Cloneable handle to the board's broadcast channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BoardEvent>,
}

impl EventBus {
    /// Creates a bus buffering `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event. Returns how many subscribers received it.
    pub fn publish(&self, event: BoardEvent) -> usize {
        tracing::trace!(?event, "board event");
        self.tx.send(event).unwrap_or(0)
    }

    /// Shorthand for publishing [`BoardEvent::Invalidate`].
    pub fn invalidate(&self, source: InvalidationSource) -> usize {
        self.publish(BoardEvent::Invalidate { source })
    }

    /// Subscribes to every event published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BoardEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// A handle that can publish without keeping the channel open.
    #[must_use]
    pub fn downgrade(&self) -> WeakEventBus {
        WeakEventBus {
            tx: self.tx.downgrade(),
        }
    }
}

/// Publishing handle that does not count towards keeping the bus alive.
///
/// Background listeners hold one of these so their subscription sees
/// `Closed` once every [`EventBus`] is dropped.
#[derive(Debug, Clone)]
pub struct WeakEventBus {
    tx: broadcast::WeakSender<BoardEvent>,
}

impl WeakEventBus {
    /// Publishes if the bus still exists. Returns how many subscribers
    /// received the event.
    pub fn publish(&self, event: BoardEvent) -> usize {
        self.tx
            .upgrade()
            .map_or(0, |tx| tx.send(event).unwrap_or(0))
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}
