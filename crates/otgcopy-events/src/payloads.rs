//! Event payload types carried on the progress channel.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::topics;

/// Identifier assigned to each event published on the bus.
pub type EventId = u64;

/// Default per-subscriber buffer for the broadcast channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Observation emitted once per source item, before its transfer starts.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// Zero-based index of the item about to be processed.
    pub handled: usize,
    /// Number of items in the batch.
    pub total: usize,
    /// Best-effort display name of the item.
    pub current_file: String,
}

/// Typed events surfaced by the copy engine.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A batch resolved its destination and is about to process its items.
    CopyStarted {
        /// Identifier of the batch.
        batch_id: Uuid,
        /// Number of source items in the batch.
        total: usize,
        /// Destination directory reference.
        destination: String,
    },
    /// An item is about to be transferred.
    CopyProgress {
        /// Identifier of the batch.
        batch_id: Uuid,
        /// Progress tuple for the item.
        progress: ProgressEvent,
    },
    /// Every item of the batch has been attempted.
    CopyCompleted {
        /// Identifier of the batch.
        batch_id: Uuid,
        /// Number of items copied successfully.
        success_count: usize,
        /// Number of source items in the batch.
        total: usize,
    },
}

impl Event {
    /// Machine-friendly discriminator used for subscriptions and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::CopyStarted { .. } => topics::COPY_STARTED,
            Self::CopyProgress { .. } => topics::COPY_PROGRESS,
            Self::CopyCompleted { .. } => topics::COPY_COMPLETED,
        }
    }

    /// Batch the event belongs to.
    #[must_use]
    pub const fn batch_id(&self) -> Uuid {
        match self {
            Self::CopyStarted { batch_id, .. }
            | Self::CopyProgress { batch_id, .. }
            | Self::CopyCompleted { batch_id, .. } => *batch_id,
        }
    }

    /// Progress tuple when the event is a `CopyProgress`.
    #[must_use]
    pub const fn progress(&self) -> Option<&ProgressEvent> {
        match self {
            Self::CopyProgress { progress, .. } => Some(progress),
            _ => None,
        }
    }
}

/// Metadata wrapper around events. Each envelope tracks the event id and
/// emission timestamp.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Sequential identifier assigned at publish time.
    pub id: EventId,
    /// Publish timestamp.
    pub timestamp: DateTime<Utc>,
    /// Event payload.
    pub event: Event,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_event_serialises_with_camel_case_fields() -> anyhow::Result<()> {
        let event = Event::CopyProgress {
            batch_id: Uuid::nil(),
            progress: ProgressEvent {
                handled: 1,
                total: 3,
                current_file: "photo.jpg".into(),
            },
        };
        let value = serde_json::to_value(&event)?;
        assert_eq!(value["type"], "copy_progress");
        assert_eq!(value["progress"]["currentFile"], "photo.jpg");
        assert_eq!(value["progress"]["handled"], 1);

        let decoded: Event = serde_json::from_value(value)?;
        assert_eq!(decoded, event);
        Ok(())
    }

    #[test]
    fn accessors_expose_batch_and_progress() {
        let batch_id = Uuid::from_u128(7);
        let started = Event::CopyStarted {
            batch_id,
            total: 2,
            destination: "mem://root".into(),
        };
        assert_eq!(started.batch_id(), batch_id);
        assert!(started.progress().is_none());

        let progress = Event::CopyProgress {
            batch_id,
            progress: ProgressEvent {
                handled: 0,
                total: 2,
                current_file: "a".into(),
            },
        };
        assert_eq!(progress.progress().map(|p| p.handled), Some(0));
    }
}
