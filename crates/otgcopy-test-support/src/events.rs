//! Helpers for observing the progress channel in tests.

use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use otgcopy_events::{Event, EventStream};
use tokio_stream::StreamExt;

/// Upper bound on the wait for any single event.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Read events from `stream` up to and including the next `CopyCompleted`.
///
/// # Errors
///
/// Returns an error if the stream closes, lags, or stays silent longer than
/// [`EVENT_TIMEOUT`].
pub async fn collect_batch(stream: &mut EventStream) -> Result<Vec<Event>> {
    let mut events = Vec::new();
    loop {
        let next = tokio::time::timeout(EVENT_TIMEOUT, stream.next())
            .await
            .map_err(|_| anyhow!("timed out waiting for copy events"))?;
        let Some(item) = next else {
            bail!("event stream closed before the batch completed");
        };
        let envelope = item.map_err(|err| anyhow!("event stream lagged: {err}"))?;
        let done = matches!(envelope.event, Event::CopyCompleted { .. });
        events.push(envelope.event);
        if done {
            return Ok(events);
        }
    }
}
