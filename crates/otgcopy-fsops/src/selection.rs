//! Controller-owned selection of source documents.

use std::collections::HashSet;

use otgcopy_storage::DocumentEntry;

use crate::model::CopyRequest;

/// Insertion-ordered set of selected source URIs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    order: Vec<String>,
    members: HashSet<String>,
}

impl Selection {
    /// Empty selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip membership of `uri`; returns whether it is now selected.
    pub fn toggle(&mut self, uri: &str) -> bool {
        if self.members.remove(uri) {
            self.order.retain(|selected| selected != uri);
            false
        } else {
            self.members.insert(uri.to_string());
            self.order.push(uri.to_string());
            true
        }
    }

    /// Replace the selection with every non-directory entry, in listing order.
    pub fn select_files<'a, I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = &'a DocumentEntry>,
    {
        self.clear();
        for entry in entries.into_iter().filter(|entry| !entry.is_directory) {
            if self.members.insert(entry.uri.clone()) {
                self.order.push(entry.uri.clone());
            }
        }
    }

    /// Deselect everything.
    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }

    /// Whether `uri` is selected.
    #[must_use]
    pub fn contains(&self, uri: &str) -> bool {
        self.members.contains(uri)
    }

    /// Number of selected URIs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Selected URIs in the order they were selected.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Turn the selection into a copy request for `destination`.
    #[must_use]
    pub fn into_request(self, destination: impl Into<String>) -> CopyRequest {
        CopyRequest {
            sources: self.order,
            destination: destination.into(),
        }
    }
}
