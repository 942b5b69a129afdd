//! # Design
//!
//! - Constant error messages; the offending URI or path travels as a field.
//! - Keep picker outcomes separate from storage failures so callers can
//!   suppress cancellation without string matching.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for provider operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors produced while resolving, listing, or streaming documents.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The URI did not parse or uses a scheme the provider does not serve.
    #[error("invalid document uri")]
    InvalidUri {
        /// Offending URI.
        uri: String,
    },
    /// The referenced node does not exist.
    #[error("document not found")]
    NotFound {
        /// URI that failed to resolve.
        uri: String,
    },
    /// The URI lies outside every granted tree.
    #[error("document outside granted trees")]
    PermissionDenied {
        /// URI that was refused.
        uri: String,
    },
    /// The reference does not resolve to an existing directory.
    #[error("invalid directory")]
    InvalidDirectory {
        /// URI that was expected to be a directory.
        uri: String,
    },
    /// A byte stream was requested for something that is not a file.
    #[error("document is not a file")]
    NotAFile {
        /// URI of the directory.
        uri: String,
    },
    /// A display name cannot be used to create a child document.
    #[error("invalid display name")]
    InvalidName {
        /// Rejected display name.
        name: String,
    },
    /// IO failures while interacting with the host filesystem.
    #[error("storage io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
}

impl StorageError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn not_found(uri: &str) -> Self {
        Self::NotFound {
            uri: uri.to_string(),
        }
    }
}

/// Outcomes of asking the user for a tree grant.
#[derive(Debug, Error)]
pub enum PickerError {
    /// The user dismissed the picker. Not a failure worth surfacing.
    #[error("picker canceled")]
    Canceled,
    /// The grant could not be persisted.
    #[error("failed to persist tree permission")]
    Permission {
        /// Location of the grant store.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The picked location is not a usable tree.
    #[error("picked location is not a usable tree")]
    Storage {
        /// Underlying storage error.
        #[from]
        source: StorageError,
    },
}

impl PickerError {
    /// Whether the error represents a user cancellation.
    #[must_use]
    pub const fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }
}
