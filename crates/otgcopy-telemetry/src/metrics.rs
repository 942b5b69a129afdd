//! Prometheus-backed copy counters and snapshot helpers.
//!
//! # Design
//! - Collector registration stays private; callers get typed increment helpers.
//! - Handles are cheap to clone and share one registry.

use std::sync::Arc;

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Outcome label for `copy_items_total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    /// The item was copied in full.
    Copied,
    /// The item failed and was skipped.
    Failed,
}

impl ItemStatus {
    const fn label(self) -> &'static str {
        match self {
            Self::Copied => "copied",
            Self::Failed => "failed",
        }
    }
}

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    copy_items_total: IntCounterVec,
    copy_bytes_total: IntCounter,
    events_emitted_total: IntCounterVec,
}

/// Point-in-time view of the copy counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Items copied in full.
    pub items_copied: u64,
    /// Items that failed.
    pub items_failed: u64,
    /// Bytes written to destinations.
    pub bytes_copied: u64,
}

impl Metrics {
    /// Construct a new registry with the copy collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any collector cannot be built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let copy_items_total = IntCounterVec::new(
            Opts::new("copy_items_total", "Copy items processed by status"),
            &["status"],
        )
        .map_err(|source| collector("copy_items_total", source))?;
        let copy_bytes_total = IntCounter::with_opts(Opts::new(
            "copy_bytes_total",
            "Bytes written to destination documents",
        ))
        .map_err(|source| collector("copy_bytes_total", source))?;
        let events_emitted_total = IntCounterVec::new(
            Opts::new("events_emitted_total", "Copy events emitted by type"),
            &["type"],
        )
        .map_err(|source| collector("events_emitted_total", source))?;

        registry
            .register(Box::new(copy_items_total.clone()))
            .map_err(|source| register("copy_items_total", source))?;
        registry
            .register(Box::new(copy_bytes_total.clone()))
            .map_err(|source| register("copy_bytes_total", source))?;
        registry
            .register(Box::new(events_emitted_total.clone()))
            .map_err(|source| register("events_emitted_total", source))?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                copy_items_total,
                copy_bytes_total,
                events_emitted_total,
            }),
        })
    }

    /// Count one processed item.
    pub fn inc_item(&self, status: ItemStatus) {
        self.inner
            .copy_items_total
            .with_label_values(&[status.label()])
            .inc();
    }

    /// Add bytes written by a completed item.
    pub fn add_bytes(&self, bytes: u64) {
        self.inner.copy_bytes_total.inc_by(bytes);
    }

    /// Increment the emitted event counter for the specific event type.
    pub fn inc_event(&self, event_type: &str) {
        self.inner
            .events_emitted_total
            .with_label_values(&[event_type])
            .inc();
    }

    /// Render the registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the copy counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let items = &self.inner.copy_items_total;
        MetricsSnapshot {
            items_copied: items.with_label_values(&[ItemStatus::Copied.label()]).get(),
            items_failed: items.with_label_values(&[ItemStatus::Failed.label()]).get(),
            bytes_copied: self.inner.copy_bytes_total.get(),
        }
    }
}

const fn collector(name: &'static str, source: prometheus::Error) -> TelemetryError {
    TelemetryError::MetricsCollector { name, source }
}

const fn register(name: &'static str, source: prometheus::Error) -> TelemetryError {
    TelemetryError::MetricsRegister { name, source }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_updates() -> anyhow::Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_item(ItemStatus::Copied);
        metrics.inc_item(ItemStatus::Copied);
        metrics.inc_item(ItemStatus::Failed);
        metrics.add_bytes(20_010);
        metrics.inc_event("copy_progress");

        let snapshot = metrics.snapshot();
        assert_eq!(
            snapshot,
            MetricsSnapshot {
                items_copied: 2,
                items_failed: 1,
                bytes_copied: 20_010,
            }
        );

        let rendered = metrics.render()?;
        assert!(rendered.contains("copy_items_total{status=\"copied\"} 2"));
        assert!(rendered.contains("events_emitted_total{type=\"copy_progress\"} 1"));
        Ok(())
    }

    #[test]
    fn clones_share_one_registry() -> anyhow::Result<()> {
        let metrics = Metrics::new()?;
        let clone = metrics.clone();
        clone.add_bytes(5);
        assert_eq!(metrics.snapshot().bytes_copied, 5);
        Ok(())
    }
}
