//! Event bus error primitives.

use crate::payloads::EventId;
use std::fmt::{self, Display, Formatter};

/// Error emitted when an event could not be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventBusError {
    /// No subscriber was attached when the event was published; it was dropped.
    NoSubscribers {
        /// Identifier assigned to the event.
        event_id: EventId,
        /// Event kind string for filtering in logs.
        event_kind: &'static str,
    },
}

impl EventBusError {
    /// Identifier assigned to the event when the failure occurred.
    #[must_use]
    pub const fn event_id(&self) -> EventId {
        match self {
            Self::NoSubscribers { event_id, .. } => *event_id,
        }
    }

    /// Event kind string associated with the failed delivery.
    #[must_use]
    pub const fn event_kind(&self) -> &'static str {
        match self {
            Self::NoSubscribers { event_kind, .. } => event_kind,
        }
    }
}

impl Display for EventBusError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("event dropped without subscribers")
    }
}

impl std::error::Error for EventBusError {}

/// Result wrapper for event bus operations.
pub type EventBusResult<T> = Result<T, EventBusError>;
