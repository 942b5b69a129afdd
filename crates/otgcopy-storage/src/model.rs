//! Document values handed out by providers.
//!
//! # Design
//! - Immutable, freely cloned value objects.
//! - Entries keep the wire names used by the presentation layer
//!   (`lastModified`, `isDirectory`, `type`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Handle to one node of a granted tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRef {
    /// Opaque identifier, unique within the granted tree.
    pub uri: String,
    /// Display name, when the provider knows one.
    pub name: Option<String>,
    /// MIME type, when known.
    pub mime_type: Option<String>,
    /// Whether the node is a directory.
    pub is_directory: bool,
}

impl DocumentRef {
    /// Display name or the supplied fallback.
    #[must_use]
    pub fn display_name_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(fallback)
    }
}

/// Child listed from a directory, with size and modification time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentEntry {
    /// Display name.
    pub name: String,
    /// Opaque identifier.
    pub uri: String,
    /// MIME type, when known.
    #[serde(rename = "type")]
    pub mime_type: Option<String>,
    /// Size in bytes; zero for directories.
    pub size: u64,
    /// Last modification time in epoch milliseconds.
    pub last_modified: i64,
    /// Whether the node is a directory.
    pub is_directory: bool,
}

impl DocumentEntry {
    /// Modification time as a UTC timestamp.
    #[must_use]
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.last_modified)
    }

    /// Reference form of the entry.
    #[must_use]
    pub fn to_ref(&self) -> DocumentRef {
        DocumentRef {
            uri: self.uri.clone(),
            name: Some(self.name.clone()),
            mime_type: self.mime_type.clone(),
            is_directory: self.is_directory,
        }
    }
}
