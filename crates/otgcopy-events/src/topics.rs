//! Event kind identifiers used by subscribers and metrics labels.

/// Kind emitted when a batch starts processing items.
pub const COPY_STARTED: &str = "copy_started";
/// Kind emitted once per item before its transfer.
pub const COPY_PROGRESS: &str = "copy_progress";
/// Kind emitted after the last item of a batch was attempted.
pub const COPY_COMPLETED: &str = "copy_completed";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payloads::{Event, ProgressEvent};
    use uuid::Uuid;

    #[test]
    fn payload_kinds_use_topic_names() {
        let id = Uuid::nil();
        let progress = Event::CopyProgress {
            batch_id: id,
            progress: ProgressEvent {
                handled: 0,
                total: 1,
                current_file: "n".into(),
            },
        };
        assert_eq!(progress.kind(), COPY_PROGRESS);
        assert_eq!(
            Event::CopyStarted {
                batch_id: id,
                total: 1,
                destination: "dest".into()
            }
            .kind(),
            COPY_STARTED
        );
        assert_eq!(
            Event::CopyCompleted {
                batch_id: id,
                success_count: 1,
                total: 1,
            }
            .kind(),
            COPY_COMPLETED
        );
    }
}
