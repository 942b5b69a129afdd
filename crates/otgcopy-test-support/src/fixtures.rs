//! Payloads and temporary document trees.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use otgcopy_storage::LocalTreeProvider;
use tempfile::TempDir;

/// Deterministic bytes of length `len`. The pattern repeats every 251 bytes
/// so block-boundary mistakes show up as content mismatches.
#[must_use]
pub fn payload(len: usize) -> Vec<u8> {
    (0..len)
        .map(|index| u8::try_from(index % 251).unwrap_or_default())
        .collect()
}

/// Temporary directory standing in for a granted USB tree.
#[derive(Debug)]
pub struct TempTree {
    dir: TempDir,
    root: PathBuf,
}

impl TempTree {
    /// Create an empty tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directory cannot be created.
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("failed to create temp tree")?;
        let root = dir
            .path()
            .canonicalize()
            .context("failed to canonicalize temp tree")?;
        Ok(Self { dir, root })
    }

    /// Canonical root path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Create a directory (and its parents) below the root.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn mkdir(&self, relative: &str) -> Result<PathBuf> {
        let path = self.root.join(relative);
        fs::create_dir_all(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        Ok(path)
    }

    /// Write `content` to a file below the root, creating parents as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_file(&self, relative: &str, content: &[u8]) -> Result<PathBuf> {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&path, content).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }

    /// `file://` URI of a path below the root; `""` names the root itself.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be expressed as a URI.
    pub fn uri(&self, relative: &str) -> Result<String> {
        let path = if relative.is_empty() {
            self.root.clone()
        } else {
            self.root.join(relative)
        };
        Ok(LocalTreeProvider::uri_for(&path)?)
    }

    /// Provider granted exactly this tree.
    #[must_use]
    pub fn provider(&self) -> LocalTreeProvider {
        LocalTreeProvider::new([self.dir.path()])
    }
}
