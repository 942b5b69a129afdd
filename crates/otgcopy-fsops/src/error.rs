//! # Design
//!
//! - `CopyError` covers the only failures that reject a whole batch.
//! - `ItemError` describes one source that could not be copied; the engine
//!   absorbs it into the batch result.
//! - Messages stay constant; URIs and operations travel as fields.

use std::error::Error as _;
use std::io;

use otgcopy_storage::StorageError;
use thiserror::Error;

/// Result type for batch-level copy operations.
pub type CopyResult<T> = Result<T, CopyError>;

/// Errors that reject a copy batch before or instead of running it.
#[derive(Debug, Error)]
pub enum CopyError {
    /// The request itself was malformed.
    #[error("invalid copy input")]
    InvalidInput {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
    },
    /// The destination could not be resolved to a directory.
    #[error("invalid copy target")]
    InvalidTarget {
        /// Destination URI as given by the caller.
        uri: String,
        /// Static reason for the failure.
        reason: &'static str,
        /// Provider error, when resolution itself failed.
        #[source]
        source: Option<StorageError>,
    },
    /// The background copy task panicked or was cancelled by the runtime.
    #[error("copy worker failed")]
    Join {
        /// Underlying join error.
        source: tokio::task::JoinError,
    },
}

/// Failure of a single source item.
#[derive(Debug, Error)]
pub enum ItemError {
    /// The source could not be opened.
    #[error("source document unavailable")]
    Source {
        /// Provider operation that failed.
        operation: &'static str,
        /// Source URI.
        uri: String,
        /// Underlying provider error.
        source: StorageError,
    },
    /// The destination entry could not be created or opened.
    #[error("destination document unavailable")]
    Destination {
        /// Provider operation that failed.
        operation: &'static str,
        /// Directory or document URI involved.
        uri: String,
        /// Underlying provider error.
        source: StorageError,
    },
    /// The source is a directory; only files are copied.
    #[error("source is not a file")]
    NotAFile {
        /// Source URI.
        uri: String,
    },
    /// Reading the source stream failed mid-transfer.
    #[error("failed to read source document")]
    Read {
        /// Source URI.
        uri: String,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Writing or flushing the destination stream failed.
    #[error("failed to write destination document")]
    Write {
        /// Destination URI.
        uri: String,
        /// Underlying IO error.
        source: io::Error,
    },
}

impl ItemError {
    /// Message and source chain joined with `": "`.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut text = self.to_string();
        let mut cause = self.source();
        while let Some(error) = cause {
            text.push_str(": ");
            text.push_str(&error.to_string());
            cause = error.source();
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn describe_walks_the_source_chain() {
        let err = ItemError::Read {
            uri: "mem://root/1".to_string(),
            source: io::Error::other("device detached"),
        };
        assert_eq!(err.to_string(), "failed to read source document");
        assert_eq!(
            err.describe(),
            "failed to read source document: device detached"
        );
    }

    #[test]
    fn invalid_target_exposes_optional_source() {
        let without = CopyError::InvalidTarget {
            uri: "mem://root/3".to_string(),
            reason: "not_a_directory",
            source: None,
        };
        assert!(without.source().is_none());

        let with = CopyError::InvalidTarget {
            uri: "mem://root/9".to_string(),
            reason: "unresolvable",
            source: Some(StorageError::NotFound {
                uri: "mem://root/9".to_string(),
            }),
        };
        assert!(with.source().is_some());
    }
}
