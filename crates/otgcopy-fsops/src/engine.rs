//! Batch copy engine.
//!
//! # Design
//! - A batch runs on the blocking pool; callers only await the join handle.
//! - The destination is resolved once, before any event is published.
//! - Items run strictly in request order, one source and one sink at a time.
//! - Item failures are logged, counted and absorbed; only an invalid request
//!   or target rejects the batch.

use std::sync::Arc;

use otgcopy_config::CopySettings;
use otgcopy_events::{Event, EventBus, ProgressEvent};
use otgcopy_storage::{DEFAULT_MIME_TYPE, DocumentProvider, DocumentRef};
use otgcopy_telemetry::{ItemStatus, Metrics};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::copier::{DEFAULT_BLOCK_SIZE, StreamCopier};
use crate::error::{CopyError, CopyResult, ItemError};
use crate::model::{BatchResult, CopyRequest, ItemFailure};

/// Tunables for a [`CopyEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyOptions {
    /// Bytes moved per read/write cycle.
    pub block_size: usize,
    /// MIME type used when a source's type cannot be determined.
    pub fallback_mime_type: String,
    /// Keep per-item failure detail in [`BatchResult::failures`].
    pub retain_failure_detail: bool,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            fallback_mime_type: DEFAULT_MIME_TYPE.to_string(),
            retain_failure_detail: true,
        }
    }
}

impl From<&CopySettings> for CopyOptions {
    fn from(settings: &CopySettings) -> Self {
        Self {
            block_size: settings.block_size,
            fallback_mime_type: settings.fallback_mime_type.clone(),
            retain_failure_detail: settings.retain_failure_detail,
        }
    }
}

/// Copies user-selected documents into a destination folder, publishing
/// progress on the shared event bus.
#[derive(Clone)]
pub struct CopyEngine {
    provider: Arc<dyn DocumentProvider>,
    events: EventBus,
    metrics: Option<Metrics>,
    copier: StreamCopier,
    retain_failure_detail: bool,
}

impl CopyEngine {
    /// Engine with default options and no metrics.
    #[must_use]
    pub fn new(provider: Arc<dyn DocumentProvider>, events: EventBus) -> Self {
        Self::with_options(provider, events, CopyOptions::default())
    }

    /// Engine with explicit options.
    #[must_use]
    pub fn with_options(
        provider: Arc<dyn DocumentProvider>,
        events: EventBus,
        options: CopyOptions,
    ) -> Self {
        Self {
            provider,
            events,
            metrics: None,
            copier: StreamCopier::new(options.block_size, options.fallback_mime_type),
            retain_failure_detail: options.retain_failure_detail,
        }
    }

    /// Record item, byte and event counters into `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Bus the engine publishes on.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Copy every source of `request` into its destination.
    ///
    /// Publishes `CopyStarted`, one `CopyProgress` per source (before that
    /// source is attempted) and `CopyCompleted`, then resolves with the
    /// batch result.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an empty source list and `InvalidTarget`
    /// when the destination is missing or not a directory; in both cases no
    /// event is published. Returns `Join` if the worker task dies.
    pub async fn copy(&self, request: CopyRequest) -> CopyResult<BatchResult> {
        if request.sources.is_empty() {
            return Err(CopyError::InvalidInput {
                field: "sources",
                reason: "empty",
            });
        }
        let engine = self.clone();
        tokio::task::spawn_blocking(move || engine.run_batch(&request))
            .await
            .map_err(|source| CopyError::Join { source })?
    }

    /// Copy `sources` into `target` and return how many were copied.
    ///
    /// # Errors
    ///
    /// Same as [`CopyEngine::copy`]; individual item failures never reject.
    pub async fn copy_files(&self, sources: Vec<String>, target: &str) -> CopyResult<usize> {
        let result = self
            .copy(CopyRequest {
                sources,
                destination: target.to_string(),
            })
            .await?;
        Ok(result.success_count)
    }

    fn run_batch(&self, request: &CopyRequest) -> CopyResult<BatchResult> {
        let destination = self.resolve_destination(&request.destination)?;
        let batch_id = Uuid::new_v4();
        let total = request.sources.len();
        info!(
            batch_id = %batch_id,
            total,
            destination = %destination.uri,
            "copy batch started"
        );
        self.publish_event(Event::CopyStarted {
            batch_id,
            total,
            destination: destination.uri.clone(),
        });

        let outcomes: Vec<Result<u64, ItemError>> = request
            .sources
            .iter()
            .enumerate()
            .map(|(index, uri)| self.copy_item(batch_id, index, total, uri, &destination.uri))
            .collect();

        let mut success_count = 0;
        let mut failures = Vec::new();
        for (index, (uri, outcome)) in request.sources.iter().zip(outcomes).enumerate() {
            match outcome {
                Ok(_) => success_count += 1,
                Err(error) if self.retain_failure_detail => failures.push(ItemFailure {
                    index,
                    uri: uri.clone(),
                    reason: error.describe(),
                }),
                Err(_) => {}
            }
        }

        self.publish_event(Event::CopyCompleted {
            batch_id,
            success_count,
            total,
        });
        info!(
            batch_id = %batch_id,
            success_count,
            total,
            "copy batch completed"
        );
        Ok(BatchResult {
            batch_id,
            success_count,
            total,
            failures,
        })
    }

    fn resolve_destination(&self, uri: &str) -> CopyResult<DocumentRef> {
        let destination = self
            .provider
            .resolve(uri)
            .map_err(|source| CopyError::InvalidTarget {
                uri: uri.to_string(),
                reason: "unresolvable",
                source: Some(source),
            })?;
        if !destination.is_directory {
            return Err(CopyError::InvalidTarget {
                uri: uri.to_string(),
                reason: "not_a_directory",
                source: None,
            });
        }
        Ok(destination)
    }

    fn copy_item(
        &self,
        batch_id: Uuid,
        index: usize,
        total: usize,
        uri: &str,
        target_dir: &str,
    ) -> Result<u64, ItemError> {
        let source = self.provider.resolve(uri).unwrap_or_else(|error| {
            debug!(index, uri, error = %error, "source name unavailable");
            DocumentRef {
                uri: uri.to_string(),
                name: None,
                mime_type: None,
                is_directory: false,
            }
        });
        let placeholder = format!("file_{index}");
        let display_name = source.display_name_or(&placeholder).to_string();

        self.publish_event(Event::CopyProgress {
            batch_id,
            progress: ProgressEvent {
                handled: index,
                total,
                current_file: display_name.clone(),
            },
        });

        let outcome = self
            .copier
            .copy(self.provider.as_ref(), &source, &display_name, target_dir);
        match &outcome {
            Ok(copied) => {
                debug!(
                    index,
                    uri,
                    destination = %copied.destination.uri,
                    bytes = copied.bytes,
                    "copy item completed"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.inc_item(ItemStatus::Copied);
                    metrics.add_bytes(copied.bytes);
                }
            }
            Err(error) => {
                warn!(
                    batch_id = %batch_id,
                    index,
                    uri,
                    error = %error.describe(),
                    "copy item failed; continuing"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.inc_item(ItemStatus::Failed);
                }
            }
        }
        outcome.map(|copied| copied.bytes)
    }

    fn publish_event(&self, event: Event) {
        if let Some(metrics) = &self.metrics {
            metrics.inc_event(event.kind());
        }
        if let Err(error) = self.events.publish(event) {
            trace!(
                event_id = error.event_id(),
                event_kind = error.event_kind(),
                "event dropped without subscribers"
            );
        }
    }
}
