//! Host filesystem trees addressed by `file://` URIs.
//!
//! # Design
//! - Every URI is canonicalised and checked against the granted roots before
//!   any IO happens; symlinks pointing outside a grant are refused.
//! - New documents are created with `create_new`, so name collisions are
//!   resolved atomically by retrying with the next numbered name.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;
use url::Url;

use crate::error::{StorageError, StorageResult};
use crate::model::{DocumentEntry, DocumentRef};
use crate::provider::{DocumentProvider, guess_mime_type, numbered_name, validate_display_name};

const FILE_SCHEME: &str = "file";
const MAX_NAME_ATTEMPTS: usize = 10_000;

/// Provider serving directories of the host filesystem the user granted.
#[derive(Debug, Clone)]
pub struct LocalTreeProvider {
    roots: Vec<PathBuf>,
}

impl LocalTreeProvider {
    /// Build a provider restricted to the given roots. Roots that cannot be
    /// canonicalised are skipped.
    #[must_use]
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let roots = roots
            .into_iter()
            .filter_map(|root| match root.as_ref().canonicalize() {
                Ok(path) => Some(path),
                Err(error) => {
                    debug!(root = %root.as_ref().display(), error = %error, "skipping unusable grant");
                    None
                }
            })
            .collect();
        Self { roots }
    }

    /// Canonical roots this provider serves.
    #[must_use]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// URI for a host path.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUri` when the path is relative or not representable.
    pub fn uri_for(path: &Path) -> StorageResult<String> {
        Url::from_file_path(path)
            .map(String::from)
            .map_err(|()| StorageError::InvalidUri {
                uri: path.display().to_string(),
            })
    }

    fn path_for(&self, uri: &str) -> StorageResult<PathBuf> {
        let parsed = Url::parse(uri).map_err(|_| StorageError::InvalidUri {
            uri: uri.to_string(),
        })?;
        if parsed.scheme() != FILE_SCHEME {
            return Err(StorageError::InvalidUri {
                uri: uri.to_string(),
            });
        }
        let path = parsed.to_file_path().map_err(|()| StorageError::InvalidUri {
            uri: uri.to_string(),
        })?;
        let canonical = match path.canonicalize() {
            Ok(canonical) => canonical,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::not_found(uri));
            }
            Err(error) => return Err(StorageError::io("local.canonicalize", path, error)),
        };
        if self.roots.iter().any(|root| canonical.starts_with(root)) {
            Ok(canonical)
        } else {
            Err(StorageError::PermissionDenied {
                uri: uri.to_string(),
            })
        }
    }

    fn reference_for(path: &Path, uri: String, is_directory: bool) -> DocumentRef {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        let mime_type = if is_directory {
            None
        } else {
            name.as_deref().and_then(guess_mime_type)
        };
        DocumentRef {
            uri,
            name,
            mime_type,
            is_directory,
        }
    }

    fn directory_path(&self, uri: &str) -> StorageResult<PathBuf> {
        let path = match self.path_for(uri) {
            Ok(path) => path,
            Err(StorageError::NotFound { .. }) => {
                return Err(StorageError::InvalidDirectory {
                    uri: uri.to_string(),
                });
            }
            Err(error) => return Err(error),
        };
        if path.is_dir() {
            Ok(path)
        } else {
            Err(StorageError::InvalidDirectory {
                uri: uri.to_string(),
            })
        }
    }

    fn file_path(&self, uri: &str) -> StorageResult<PathBuf> {
        let path = self.path_for(uri)?;
        if path.is_dir() {
            return Err(StorageError::NotAFile {
                uri: uri.to_string(),
            });
        }
        Ok(path)
    }
}

impl DocumentProvider for LocalTreeProvider {
    fn resolve(&self, uri: &str) -> StorageResult<DocumentRef> {
        let path = self.path_for(uri)?;
        let is_directory = path.is_dir();
        Ok(Self::reference_for(&path, uri.to_string(), is_directory))
    }

    fn list_children(&self, tree_uri: &str) -> StorageResult<Vec<DocumentEntry>> {
        let directory = self.directory_path(tree_uri)?;
        let reader = fs::read_dir(&directory)
            .map_err(|source| StorageError::io("local.read_dir", &directory, source))?;

        let mut entries = Vec::new();
        for item in reader {
            let item =
                item.map_err(|source| StorageError::io("local.read_dir", &directory, source))?;
            let path = item.path();
            let metadata = match fs::metadata(&path) {
                Ok(metadata) => metadata,
                Err(error) => {
                    debug!(path = %path.display(), error = %error, "skipping unreadable entry");
                    continue;
                }
            };
            let is_directory = metadata.is_dir();
            let last_modified = metadata
                .modified()
                .map(|time| DateTime::<Utc>::from(time).timestamp_millis())
                .unwrap_or_default();
            let uri = Self::uri_for(&path)?;
            let reference = Self::reference_for(&path, uri, is_directory);
            entries.push(DocumentEntry {
                name: reference.name.unwrap_or_default(),
                uri: reference.uri,
                mime_type: reference.mime_type,
                size: if is_directory { 0 } else { metadata.len() },
                last_modified,
                is_directory,
            });
        }

        entries.sort_by(|left, right| {
            right
                .is_directory
                .cmp(&left.is_directory)
                .then_with(|| left.name.cmp(&right.name))
        });
        Ok(entries)
    }

    fn open_read(&self, uri: &str) -> StorageResult<Box<dyn Read + Send>> {
        let path = self.file_path(uri)?;
        let file =
            File::open(&path).map_err(|source| StorageError::io("local.open_read", &path, source))?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn create_document(
        &self,
        parent_uri: &str,
        _mime_type: &str,
        display_name: &str,
    ) -> StorageResult<DocumentRef> {
        validate_display_name(display_name)?;
        let parent = self.directory_path(parent_uri)?;

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let candidate = parent.join(numbered_name(display_name, attempt));
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&candidate)
            {
                Ok(_) => {
                    let uri = Self::uri_for(&candidate)?;
                    debug!(path = %candidate.display(), "created document");
                    return Ok(Self::reference_for(&candidate, uri, false));
                }
                Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {}
                Err(error) => {
                    return Err(StorageError::io("local.create_document", candidate, error));
                }
            }
        }

        Err(StorageError::io(
            "local.create_document",
            parent.join(display_name),
            io::Error::from(io::ErrorKind::AlreadyExists),
        ))
    }

    fn open_write(&self, uri: &str) -> StorageResult<Box<dyn Write + Send>> {
        let path = self.file_path(uri)?;
        let file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(|source| StorageError::io("local.open_write", &path, source))?;
        Ok(Box::new(BufWriter::new(file)))
    }
}
