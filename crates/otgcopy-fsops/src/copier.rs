//! Single-document streaming copy.
//!
//! # Design
//! - Source and sink are locals of `copy`; both are dropped, and so released,
//!   on every return path including `?` exits.
//! - The source is opened before the destination entry is created, so an
//!   unreadable source leaves no empty file behind.

use std::io::{ErrorKind, Read, Write};

use otgcopy_storage::{DEFAULT_MIME_TYPE, DocumentProvider, DocumentRef, guess_mime_type};

use crate::error::ItemError;

/// Default number of bytes moved per read/write cycle.
pub const DEFAULT_BLOCK_SIZE: usize = 8 * 1024;

/// Destination entry written by a successful copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopiedItem {
    /// The newly created destination document.
    pub destination: DocumentRef,
    /// Bytes written.
    pub bytes: u64,
}

/// Copies one source document into a new entry of a target directory using a
/// fixed-size buffer.
#[derive(Debug, Clone)]
pub struct StreamCopier {
    block_size: usize,
    fallback_mime_type: String,
}

impl Default for StreamCopier {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_SIZE, DEFAULT_MIME_TYPE)
    }
}

impl StreamCopier {
    /// Copier moving `block_size` bytes per cycle. A zero block size is
    /// raised to one byte.
    #[must_use]
    pub fn new(block_size: usize, fallback_mime_type: impl Into<String>) -> Self {
        Self {
            block_size: block_size.max(1),
            fallback_mime_type: fallback_mime_type.into(),
        }
    }

    /// Bytes moved per cycle.
    #[must_use]
    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    /// MIME type for the destination: the source's own type, then a guess
    /// from `display_name`, then the fallback.
    #[must_use]
    pub fn mime_type_for(&self, source: &DocumentRef, display_name: &str) -> String {
        source
            .mime_type
            .clone()
            .filter(|value| !value.trim().is_empty())
            .or_else(|| guess_mime_type(display_name))
            .unwrap_or_else(|| self.fallback_mime_type.clone())
    }

    /// Copy `source` into a new document named `display_name` inside
    /// `target_dir`. Both streams are dropped before this returns.
    ///
    /// # Errors
    ///
    /// Returns an [`ItemError`] when the source cannot be opened or read, or
    /// the destination cannot be created, written or flushed. Bytes already
    /// written stay in the destination.
    pub fn copy(
        &self,
        provider: &dyn DocumentProvider,
        source: &DocumentRef,
        display_name: &str,
        target_dir: &str,
    ) -> Result<CopiedItem, ItemError> {
        if source.is_directory {
            return Err(ItemError::NotAFile {
                uri: source.uri.clone(),
            });
        }
        let mut reader = provider
            .open_read(&source.uri)
            .map_err(|err| ItemError::Source {
                operation: "open_read",
                uri: source.uri.clone(),
                source: err,
            })?;

        let mime_type = self.mime_type_for(source, display_name);
        let destination = provider
            .create_document(target_dir, &mime_type, display_name)
            .map_err(|err| ItemError::Destination {
                operation: "create_document",
                uri: target_dir.to_string(),
                source: err,
            })?;
        let mut writer =
            provider
                .open_write(&destination.uri)
                .map_err(|err| ItemError::Destination {
                    operation: "open_write",
                    uri: destination.uri.clone(),
                    source: err,
                })?;

        let bytes = self.pump(
            reader.as_mut(),
            writer.as_mut(),
            &source.uri,
            &destination.uri,
        )?;
        Ok(CopiedItem { destination, bytes })
    }

    fn pump(
        &self,
        reader: &mut dyn Read,
        writer: &mut dyn Write,
        source_uri: &str,
        destination_uri: &str,
    ) -> Result<u64, ItemError> {
        let mut buffer = vec![0_u8; self.block_size];
        let mut total: u64 = 0;
        loop {
            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(read) => read,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    return Err(ItemError::Read {
                        uri: source_uri.to_string(),
                        source: err,
                    });
                }
            };
            writer
                .write_all(&buffer[..read])
                .map_err(|err| ItemError::Write {
                    uri: destination_uri.to_string(),
                    source: err,
                })?;
            total += read as u64;
        }
        writer.flush().map_err(|err| ItemError::Write {
            uri: destination_uri.to_string(),
            source: err,
        })?;
        Ok(total)
    }
}
