//! Broadcast bus carrying copy events to any number of observers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tokio::sync::broadcast::{self, Receiver, Sender};
use tokio_stream::wrappers::BroadcastStream;

use crate::error::{EventBusError, EventBusResult};
use crate::payloads::{DEFAULT_CHANNEL_CAPACITY, Event, EventEnvelope, EventId};

/// Stream wrapper used by subscribers. Lagging subscribers observe a
/// `Lagged` item and then continue with the newest events.
pub type EventStream = BroadcastStream<EventEnvelope>;

/// Shared event bus built on top of `tokio::broadcast`.
///
/// Cloning the bus is cheap; clones publish into the same channel and share
/// the identifier sequence.
#[derive(Clone)]
pub struct EventBus {
    sender: Sender<EventEnvelope>,
    next_id: Arc<AtomicU64>,
}

impl EventBus {
    /// Construct a bus whose subscribers each buffer at most `capacity`
    /// undelivered events.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "event bus capacity must be positive");
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Construct a bus with the default channel capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Subscribe to events published from now on. Nothing is replayed.
    #[must_use]
    pub fn subscribe(&self) -> EventStream {
        BroadcastStream::new(self.receiver())
    }

    /// Publish an event to every current subscriber.
    ///
    /// The event always consumes an identifier, even when it is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::NoSubscribers`] when nobody was subscribed;
    /// the event is discarded in that case.
    pub fn publish(&self, event: Event) -> EventBusResult<EventId> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let event_kind = event.kind();
        let envelope = EventEnvelope {
            id,
            timestamp: Utc::now(),
            event,
        };
        self.sender
            .send(envelope)
            .map(|_| id)
            .map_err(|_| EventBusError::NoSubscribers {
                event_id: id,
                event_kind,
            })
    }

    /// Number of receivers currently attached.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub(crate) fn receiver(&self) -> Receiver<EventEnvelope> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
