//! Provider trait implemented by every document-tree backend.

use std::io::{Read, Write};

use crate::error::{StorageError, StorageResult};
use crate::model::{DocumentEntry, DocumentRef};

/// MIME type used when neither the source nor its extension reveals one.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Access to a granted document tree.
///
/// Implementations provide access to different storage backends:
/// - [`crate::LocalTreeProvider`]: directories on the host filesystem
/// - [`crate::MemoryProvider`]: in-memory trees for testing
///
/// All operations are blocking. Streams are released when the returned boxes
/// are dropped.
pub trait DocumentProvider: Send + Sync {
    /// Resolve a URI into a reference.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the node does not exist and `PermissionDenied`
    /// when the URI is outside every granted tree.
    fn resolve(&self, uri: &str) -> StorageResult<DocumentRef>;

    /// Enumerate the immediate children of a directory.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDirectory` when `tree_uri` is not an existing directory.
    fn list_children(&self, tree_uri: &str) -> StorageResult<Vec<DocumentEntry>>;

    /// Open a readable byte stream over a file.
    ///
    /// # Errors
    ///
    /// Returns `NotAFile` for directories, or the failure to open the stream.
    fn open_read(&self, uri: &str) -> StorageResult<Box<dyn Read + Send>>;

    /// Create an empty document inside `parent_uri`. When `display_name` is
    /// taken the provider picks the next free `name (n).ext`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDirectory` when the parent is not a directory, or
    /// `InvalidName` when the name cannot name a child.
    fn create_document(
        &self,
        parent_uri: &str,
        mime_type: &str,
        display_name: &str,
    ) -> StorageResult<DocumentRef>;

    /// Open a writable byte stream that replaces the document's content.
    ///
    /// # Errors
    ///
    /// Returns `NotAFile` for directories, or the failure to open the stream.
    fn open_write(&self, uri: &str) -> StorageResult<Box<dyn Write + Send>>;
}

/// Best-effort MIME type derived from a display name's extension.
#[must_use]
pub fn guess_mime_type(display_name: &str) -> Option<String> {
    mime_guess::from_path(display_name)
        .first_raw()
        .map(str::to_string)
}

/// Reject names that would escape or alias the parent directory.
pub(crate) fn validate_display_name(name: &str) -> StorageResult<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(StorageError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Candidate for the `attempt`-th collision: `name`, `name (1)`, `name (2)`,
/// with the suffix placed before the extension.
pub(crate) fn numbered_name(display_name: &str, attempt: usize) -> String {
    if attempt == 0 {
        return display_name.to_string();
    }
    match display_name.rfind('.') {
        Some(dot) if dot > 0 => {
            let (stem, ext) = display_name.split_at(dot);
            format!("{stem} ({attempt}){ext}")
        }
        _ => format!("{display_name} ({attempt})"),
    }
}
