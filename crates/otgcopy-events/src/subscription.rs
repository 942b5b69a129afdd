//! Handler-based subscriptions filtered by event kind.
//!
//! A listener owns a forwarding task on the Tokio runtime, so handlers run on
//! a worker thread and never on the publisher's thread. Delivery and
//! unsubscription serialise on a per-subscription lock: once
//! [`Subscription::unsubscribe`] returns, the handler is not running and will
//! not run again.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::payloads::EventEnvelope;
use crate::routing::EventBus;

/// Live registration of a handler on the bus. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    kind: &'static str,
    active: Arc<Mutex<bool>>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Event kind the handler is registered for.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        self.kind
    }

    /// Whether the handler may still be invoked.
    #[must_use]
    pub fn is_active(&self) -> bool {
        *lock_flag(&self.active)
    }

    /// Detach the handler. Calling this more than once is a no-op.
    ///
    /// Must not be called from inside the handler itself.
    pub fn unsubscribe(&mut self) {
        let mut active = lock_flag(&self.active);
        if !*active {
            return;
        }
        *active = false;
        drop(active);
        if let Some(task) = self.task.take() {
            task.abort();
        }
        debug!(kind = self.kind, "progress listener detached");
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl EventBus {
    /// Invoke `handler` for every event of the given `kind` published after
    /// this call returns.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn listen<F>(&self, kind: &'static str, handler: F) -> Subscription
    where
        F: Fn(&EventEnvelope) + Send + 'static,
    {
        let mut receiver = self.receiver();
        let active = Arc::new(Mutex::new(true));
        let flag = Arc::clone(&active);

        let task = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(envelope) => {
                        if envelope.event.kind() != kind {
                            continue;
                        }
                        let guard = lock_flag(&flag);
                        if !*guard {
                            break;
                        }
                        handler(&envelope);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(kind, skipped, "progress listener lagged behind");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Subscription {
            kind,
            active,
            task: Some(task),
        }
    }
}

fn lock_flag(flag: &Mutex<bool>) -> MutexGuard<'_, bool> {
    flag.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payloads::{Event, ProgressEvent};
    use crate::topics;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;
    use uuid::Uuid;

    const RECV_TIMEOUT: Duration = Duration::from_secs(1);

    fn progress(index: usize) -> Event {
        Event::CopyProgress {
            batch_id: Uuid::nil(),
            progress: ProgressEvent {
                handled: index,
                total: 3,
                current_file: format!("item-{index}"),
            },
        }
    }

    #[tokio::test]
    async fn listener_receives_only_matching_kind() -> anyhow::Result<()> {
        let bus = EventBus::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let subscription = bus.listen(topics::COPY_PROGRESS, move |envelope| {
            let _ = tx.send(envelope.event.clone());
        });
        assert_eq!(subscription.kind(), topics::COPY_PROGRESS);

        bus.publish(Event::CopyStarted {
            batch_id: Uuid::nil(),
            total: 1,
            destination: "mem://root".into(),
        })?;
        bus.publish(progress(0))?;

        let received = timeout(RECV_TIMEOUT, rx.recv())
            .await?
            .expect("handler channel open");
        assert_eq!(received, progress(0));
        assert!(rx.try_recv().is_err());
        Ok(())
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent_and_stops_delivery() -> anyhow::Result<()> {
        let bus = EventBus::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut subscription = bus.listen(topics::COPY_PROGRESS, move |envelope| {
            let _ = tx.send(envelope.id);
        });

        let first = bus.publish(progress(0))?;
        let received = timeout(RECV_TIMEOUT, rx.recv()).await?;
        assert_eq!(received, Some(first));

        subscription.unsubscribe();
        subscription.unsubscribe();
        assert!(!subscription.is_active());

        let _ = bus.publish(progress(1));
        let after = timeout(RECV_TIMEOUT, rx.recv()).await?;
        assert_eq!(after, None, "handler dropped with the aborted task");
        Ok(())
    }

    #[tokio::test]
    async fn dropping_subscription_detaches_receiver() {
        let bus = EventBus::new();
        {
            let _subscription = bus.listen(topics::COPY_PROGRESS, |_| {});
            assert_eq!(bus.subscriber_count(), 1);
        }
        tokio::task::yield_now().await;
        let result = timeout(RECV_TIMEOUT, async {
            while bus.subscriber_count() > 0 {
                tokio::task::yield_now().await;
            }
        })
        .await;
        assert!(result.is_ok());
    }
}
