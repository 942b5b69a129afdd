//! Request and result values for copy batches.
//!
//! # Design
//! - Plain owned data; no provider handles or streams.
//! - `failed_count` is derived so it can never disagree with the counts.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sources to copy, in order, and the folder to copy them into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyRequest {
    /// Source document URIs. Order is preserved and duplicates are copied
    /// once per occurrence.
    pub sources: Vec<String>,
    /// Destination folder URI.
    pub destination: String,
}

impl CopyRequest {
    /// Build a request from any iterable of source URIs.
    pub fn new<I, S>(sources: I, destination: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
            destination: destination.into(),
        }
    }
}

/// One source that could not be copied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    /// Position of the source in the request.
    pub index: usize,
    /// Source URI.
    pub uri: String,
    /// Error message with its source chain.
    pub reason: String,
}

/// Outcome of a completed batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    /// Identifier shared with the batch's events.
    pub batch_id: Uuid,
    /// Sources copied in full.
    pub success_count: usize,
    /// Sources in the request.
    pub total: usize,
    /// Per-item failures, empty when failure detail is not retained.
    pub failures: Vec<ItemFailure>,
}

impl BatchResult {
    /// Sources that failed.
    #[must_use]
    pub const fn failed_count(&self) -> usize {
        self.total - self.success_count
    }

    /// Whether every source was copied.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.success_count == self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_keeps_order_and_duplicates() {
        let request = CopyRequest::new(["b", "a", "b"], "mem://root");
        assert_eq!(request.sources, ["b", "a", "b"]);
        assert_eq!(request.destination, "mem://root");
    }

    #[test]
    fn failed_count_is_derived() {
        let result = BatchResult {
            batch_id: Uuid::nil(),
            success_count: 2,
            total: 3,
            failures: Vec::new(),
        };
        assert_eq!(result.failed_count(), 1);
        assert!(!result.is_complete());
    }

    #[test]
    fn result_serialises_for_json_output() -> anyhow::Result<()> {
        let result = BatchResult {
            batch_id: Uuid::nil(),
            success_count: 0,
            total: 1,
            failures: vec![ItemFailure {
                index: 0,
                uri: "mem://root/1".to_string(),
                reason: "source is not a file".to_string(),
            }],
        };
        let value = serde_json::to_value(&result)?;
        assert_eq!(value["failures"][0]["index"], 0);
        assert_eq!(value["success_count"], 0);
        Ok(())
    }
}
