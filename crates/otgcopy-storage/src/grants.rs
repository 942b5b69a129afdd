//! Persisted tree grants and the pickers that produce them.
//!
//! # Design
//! - Grants live in a small JSON document so they survive restarts, the way a
//!   platform keeps persistable URI permissions.
//! - Writes go through a temp file and a rename; a failure to persist is a
//!   permission failure of the picker operation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PickerError, StorageError};
use crate::local::LocalTreeProvider;

const GRANTS_FILE: &str = "grants.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct GrantDocument {
    trees: Vec<String>,
}

/// Tree URIs the user has granted, persisted under a state directory.
#[derive(Debug)]
pub struct GrantStore {
    path: PathBuf,
    document: GrantDocument,
}

impl GrantStore {
    /// Load the grants stored under `state_dir`, starting empty if none exist.
    ///
    /// # Errors
    ///
    /// Returns an IO error when an existing grants file cannot be read or is
    /// not valid JSON.
    pub fn open(state_dir: &Path) -> io::Result<Self> {
        let path = state_dir.join(GRANTS_FILE);
        let document = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?,
            Err(error) if error.kind() == io::ErrorKind::NotFound => GrantDocument::default(),
            Err(error) => return Err(error),
        };
        Ok(Self { path, document })
    }

    /// Granted tree URIs in the order they were granted.
    #[must_use]
    pub fn trees(&self) -> &[String] {
        &self.document.trees
    }

    /// Grant access to the directory at `path` and persist the grant.
    /// Granting the same tree twice keeps a single entry.
    ///
    /// # Errors
    ///
    /// Returns `Storage` when `path` is not an existing directory and
    /// `Permission` when the grant cannot be persisted.
    pub fn grant(&mut self, path: &Path) -> Result<String, PickerError> {
        let canonical = path
            .canonicalize()
            .ok()
            .filter(|candidate| candidate.is_dir())
            .ok_or_else(|| StorageError::InvalidDirectory {
                uri: path.display().to_string(),
            })?;
        let uri = LocalTreeProvider::uri_for(&canonical)?;
        if !self.document.trees.contains(&uri) {
            self.document.trees.push(uri.clone());
            if let Err(error) = self.persist() {
                self.document.trees.pop();
                return Err(error);
            }
            info!(tree = %uri, "tree access granted");
        }
        Ok(uri)
    }

    /// Provider restricted to the granted trees.
    #[must_use]
    pub fn provider(&self) -> LocalTreeProvider {
        LocalTreeProvider::new(
            self.document
                .trees
                .iter()
                .filter_map(|uri| url::Url::parse(uri).ok()?.to_file_path().ok()),
        )
    }

    fn persist(&self) -> Result<(), PickerError> {
        let permission = |source: io::Error| PickerError::Permission {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(permission)?;
        }
        let body = serde_json::to_vec_pretty(&self.document)
            .map_err(|err| permission(io::Error::new(io::ErrorKind::InvalidData, err)))?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, body).map_err(permission)?;
        fs::rename(&staging, &self.path).map_err(permission)
    }
}

/// Source of user-approved tree grants.
pub trait TreePicker {
    /// Ask the user for a tree and return its persisted URI.
    ///
    /// # Errors
    ///
    /// Returns `Canceled` when the user dismisses the picker and `Permission`
    /// when the grant cannot be persisted.
    fn acquire_tree(&mut self) -> Result<String, PickerError>;
}

/// Non-interactive picker: the "choice" is a path given up front, and no path
/// means the user dismissed the picker.
#[derive(Debug)]
pub struct PathPicker<'a> {
    store: &'a mut GrantStore,
    choice: Option<PathBuf>,
}

impl<'a> PathPicker<'a> {
    /// Picker that will grant `choice` in `store`.
    #[must_use]
    pub fn new(store: &'a mut GrantStore, choice: Option<PathBuf>) -> Self {
        Self { store, choice }
    }
}

impl TreePicker for PathPicker<'_> {
    fn acquire_tree(&mut self) -> Result<String, PickerError> {
        let choice = self.choice.take().ok_or(PickerError::Canceled)?;
        self.store.grant(&choice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::DocumentProvider;
    use anyhow::Result;

    #[test]
    fn grants_persist_across_reopen() -> Result<()> {
        let state = tempfile::tempdir()?;
        let tree = tempfile::tempdir()?;

        let mut store = GrantStore::open(state.path())?;
        let uri = store.grant(tree.path())?;
        let again = store.grant(tree.path())?;
        assert_eq!(uri, again);
        assert_eq!(store.trees().len(), 1);

        let reopened = GrantStore::open(state.path())?;
        assert_eq!(reopened.trees(), [uri.clone()]);
        let provider = reopened.provider();
        assert!(provider.resolve(&uri)?.is_directory);
        Ok(())
    }

    #[test]
    fn granting_a_file_is_rejected() -> Result<()> {
        let state = tempfile::tempdir()?;
        let file = state.path().join("not-a-dir");
        fs::write(&file, b"x")?;
        let mut store = GrantStore::open(state.path())?;
        assert!(matches!(
            store.grant(&file),
            Err(PickerError::Storage {
                source: StorageError::InvalidDirectory { .. }
            })
        ));
        assert!(store.trees().is_empty());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn blocked_staging_file_is_a_permission_error() -> Result<()> {
        let state = tempfile::tempdir()?;
        fs::create_dir(state.path().join("grants.json.tmp"))?;
        let tree = tempfile::tempdir()?;

        let mut store = GrantStore::open(state.path())?;
        let err = store.grant(tree.path()).expect_err("staging path is a directory");
        assert!(matches!(err, PickerError::Permission { .. }));
        assert!(store.trees().is_empty());
        Ok(())
    }

    #[test]
    fn path_picker_without_choice_is_canceled() -> Result<()> {
        let state = tempfile::tempdir()?;
        let mut store = GrantStore::open(state.path())?;
        let mut picker = PathPicker::new(&mut store, None);
        assert!(picker.acquire_tree().is_err_and(|err| err.is_canceled()));

        let tree = tempfile::tempdir()?;
        let mut picker = PathPicker::new(&mut store, Some(tree.path().to_path_buf()));
        let uri = picker.acquire_tree()?;
        assert!(uri.starts_with("file://"));
        Ok(())
    }
}
