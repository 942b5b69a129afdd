//! In-memory document trees with fault injection.
//!
//! Used by tests and dry runs. The provider tracks how many streams are open
//! so callers can assert that every stream is released, and can be told to
//! fail reads or writes for specific documents.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;

use crate::error::{StorageError, StorageResult};
use crate::model::{DocumentEntry, DocumentRef};
use crate::provider::{DocumentProvider, numbered_name, validate_display_name};

const ROOT_URI: &str = "mem://root";

#[derive(Debug)]
enum NodeKind {
    Directory,
    File(Arc<Mutex<Vec<u8>>>),
}

#[derive(Debug)]
struct Node {
    name: String,
    parent: Option<String>,
    mime_type: Option<String>,
    last_modified: i64,
    kind: NodeKind,
}

#[derive(Debug, Default)]
struct Faults {
    read_after: HashMap<String, usize>,
    write_names: HashSet<String>,
    create_denied: HashSet<String>,
}

#[derive(Debug, Default)]
struct State {
    nodes: BTreeMap<String, Node>,
    next_id: u64,
    faults: Faults,
}

/// Document tree held entirely in memory.
#[derive(Debug, Clone)]
pub struct MemoryProvider {
    state: Arc<Mutex<State>>,
    open_streams: Arc<AtomicUsize>,
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProvider {
    /// Create a provider holding a single empty root directory.
    #[must_use]
    pub fn new() -> Self {
        let mut state = State::default();
        state.nodes.insert(
            ROOT_URI.to_string(),
            Node {
                name: "root".to_string(),
                parent: None,
                mime_type: None,
                last_modified: Utc::now().timestamp_millis(),
                kind: NodeKind::Directory,
            },
        );
        Self {
            state: Arc::new(Mutex::new(state)),
            open_streams: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// URI of the root directory.
    #[must_use]
    pub const fn root_uri(&self) -> &'static str {
        ROOT_URI
    }

    /// Add a directory under `parent_uri` and return its URI.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDirectory` when the parent is not a directory.
    pub fn add_dir(&self, parent_uri: &str, name: &str) -> StorageResult<String> {
        self.insert(parent_uri, name, None, NodeKind::Directory)
    }

    /// Add a file with the given content under `parent_uri` and return its URI.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDirectory` when the parent is not a directory.
    pub fn add_file(&self, parent_uri: &str, name: &str, content: &[u8]) -> StorageResult<String> {
        let mime_type = crate::provider::guess_mime_type(name);
        self.insert(
            parent_uri,
            name,
            mime_type,
            NodeKind::File(Arc::new(Mutex::new(content.to_vec()))),
        )
    }

    /// Make reads of `uri` fail once `after` bytes have been returned.
    pub fn fail_reads_after(&self, uri: &str, after: usize) {
        self.lock().faults.read_after.insert(uri.to_string(), after);
    }

    /// Make writes fail for every document created with `display_name`.
    pub fn fail_writes_named(&self, display_name: &str) {
        self.lock()
            .faults
            .write_names
            .insert(display_name.to_string());
    }

    /// Refuse to create any document inside `parent_uri`.
    pub fn deny_create_in(&self, parent_uri: &str) {
        self.lock()
            .faults
            .create_denied
            .insert(parent_uri.to_string());
    }

    /// Current content of a file, if it exists.
    #[must_use]
    pub fn content(&self, uri: &str) -> Option<Vec<u8>> {
        let state = self.lock();
        match &state.nodes.get(uri)?.kind {
            NodeKind::File(data) => Some(lock_data(data).clone()),
            NodeKind::Directory => None,
        }
    }

    /// Names of the children of `parent_uri`, in creation order.
    #[must_use]
    pub fn child_names(&self, parent_uri: &str) -> Vec<String> {
        let state = self.lock();
        let mut children: Vec<(&String, &Node)> = state
            .nodes
            .iter()
            .filter(|(_, node)| node.parent.as_deref() == Some(parent_uri))
            .collect();
        children.sort_by_key(|(uri, _)| uri_sequence(uri));
        children
            .into_iter()
            .map(|(_, node)| node.name.clone())
            .collect()
    }

    /// Number of read or write streams that have not been dropped yet.
    #[must_use]
    pub fn open_streams(&self) -> usize {
        self.open_streams.load(Ordering::SeqCst)
    }

    fn insert(
        &self,
        parent_uri: &str,
        name: &str,
        mime_type: Option<String>,
        kind: NodeKind,
    ) -> StorageResult<String> {
        validate_display_name(name)?;
        let mut state = self.lock();
        ensure_directory(&state, parent_uri)?;
        state.next_id += 1;
        let uri = format!("{ROOT_URI}/{}", state.next_id);
        state.nodes.insert(
            uri.clone(),
            Node {
                name: name.to_string(),
                parent: Some(parent_uri.to_string()),
                mime_type,
                last_modified: Utc::now().timestamp_millis(),
                kind,
            },
        );
        Ok(uri)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stream_guard(&self) -> StreamGuard {
        self.open_streams.fetch_add(1, Ordering::SeqCst);
        StreamGuard {
            counter: Arc::clone(&self.open_streams),
        }
    }
}

impl DocumentProvider for MemoryProvider {
    fn resolve(&self, uri: &str) -> StorageResult<DocumentRef> {
        let state = self.lock();
        let node = state
            .nodes
            .get(uri)
            .ok_or_else(|| StorageError::not_found(uri))?;
        Ok(DocumentRef {
            uri: uri.to_string(),
            name: Some(node.name.clone()),
            mime_type: node.mime_type.clone(),
            is_directory: matches!(node.kind, NodeKind::Directory),
        })
    }

    fn list_children(&self, tree_uri: &str) -> StorageResult<Vec<DocumentEntry>> {
        let state = self.lock();
        ensure_directory(&state, tree_uri)?;
        let mut entries: Vec<DocumentEntry> = state
            .nodes
            .iter()
            .filter(|(_, node)| node.parent.as_deref() == Some(tree_uri))
            .map(|(uri, node)| {
                let (size, is_directory) = match &node.kind {
                    NodeKind::Directory => (0, true),
                    NodeKind::File(data) => (lock_data(data).len() as u64, false),
                };
                DocumentEntry {
                    name: node.name.clone(),
                    uri: uri.clone(),
                    mime_type: node.mime_type.clone(),
                    size,
                    last_modified: node.last_modified,
                    is_directory,
                }
            })
            .collect();
        entries.sort_by(|left, right| {
            right
                .is_directory
                .cmp(&left.is_directory)
                .then_with(|| left.name.cmp(&right.name))
        });
        Ok(entries)
    }

    fn open_read(&self, uri: &str) -> StorageResult<Box<dyn Read + Send>> {
        let state = self.lock();
        let node = state
            .nodes
            .get(uri)
            .ok_or_else(|| StorageError::not_found(uri))?;
        let NodeKind::File(data) = &node.kind else {
            return Err(StorageError::NotAFile {
                uri: uri.to_string(),
            });
        };
        let content = lock_data(data).clone();
        let fail_after = state.faults.read_after.get(uri).copied();
        drop(state);

        Ok(Box::new(MemoryReader {
            content,
            position: 0,
            fail_after,
            _guard: self.stream_guard(),
        }))
    }

    fn create_document(
        &self,
        parent_uri: &str,
        mime_type: &str,
        display_name: &str,
    ) -> StorageResult<DocumentRef> {
        validate_display_name(display_name)?;
        let state = self.lock();
        ensure_directory(&state, parent_uri)?;
        if state.faults.create_denied.contains(parent_uri) {
            return Err(StorageError::PermissionDenied {
                uri: parent_uri.to_string(),
            });
        }
        let taken: HashSet<&str> = state
            .nodes
            .values()
            .filter(|node| node.parent.as_deref() == Some(parent_uri))
            .map(|node| node.name.as_str())
            .collect();
        let name = (0..)
            .map(|attempt| numbered_name(display_name, attempt))
            .find(|candidate| !taken.contains(candidate.as_str()))
            .unwrap_or_else(|| display_name.to_string());
        drop(taken);
        drop(state);

        let uri = self.insert(
            parent_uri,
            &name,
            Some(mime_type.to_string()),
            NodeKind::File(Arc::new(Mutex::new(Vec::new()))),
        )?;
        Ok(DocumentRef {
            uri,
            name: Some(name),
            mime_type: Some(mime_type.to_string()),
            is_directory: false,
        })
    }

    fn open_write(&self, uri: &str) -> StorageResult<Box<dyn Write + Send>> {
        let state = self.lock();
        let node = state
            .nodes
            .get(uri)
            .ok_or_else(|| StorageError::not_found(uri))?;
        let NodeKind::File(data) = &node.kind else {
            return Err(StorageError::NotAFile {
                uri: uri.to_string(),
            });
        };
        let data = Arc::clone(data);
        let fail = state.faults.write_names.contains(&node.name);
        drop(state);

        lock_data(&data).clear();
        Ok(Box::new(MemoryWriter {
            data,
            fail,
            _guard: self.stream_guard(),
        }))
    }
}

fn ensure_directory(state: &State, uri: &str) -> StorageResult<()> {
    match state.nodes.get(uri) {
        Some(Node {
            kind: NodeKind::Directory,
            ..
        }) => Ok(()),
        _ => Err(StorageError::InvalidDirectory {
            uri: uri.to_string(),
        }),
    }
}

fn lock_data(data: &Mutex<Vec<u8>>) -> MutexGuard<'_, Vec<u8>> {
    data.lock().unwrap_or_else(PoisonError::into_inner)
}

fn uri_sequence(uri: &str) -> u64 {
    uri.rsplit('/')
        .next()
        .and_then(|tail| tail.parse().ok())
        .unwrap_or_default()
}

struct StreamGuard {
    counter: Arc<AtomicUsize>,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

struct MemoryReader {
    content: Vec<u8>,
    position: usize,
    fail_after: Option<usize>,
    _guard: StreamGuard,
}

impl Read for MemoryReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut end = self.content.len();
        if let Some(limit) = self.fail_after {
            if self.position >= limit {
                return Err(io::Error::other("injected read failure"));
            }
            end = end.min(limit);
        }
        let available = end.saturating_sub(self.position);
        let count = available.min(buf.len());
        buf[..count].copy_from_slice(&self.content[self.position..self.position + count]);
        self.position += count;
        Ok(count)
    }
}

struct MemoryWriter {
    data: Arc<Mutex<Vec<u8>>>,
    fail: bool,
    _guard: StreamGuard,
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.fail {
            return Err(io::Error::other("injected write failure"));
        }
        lock_data(&self.data).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.fail {
            return Err(io::Error::other("injected write failure"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn files_and_directories_resolve() -> Result<()> {
        let provider = MemoryProvider::new();
        let dir = provider.add_dir(provider.root_uri(), "DCIM")?;
        let file = provider.add_file(&dir, "clip.mp4", b"frames")?;

        let reference = provider.resolve(&file)?;
        assert_eq!(reference.name.as_deref(), Some("clip.mp4"));
        assert_eq!(reference.mime_type.as_deref(), Some("video/mp4"));
        assert!(!reference.is_directory);
        assert!(provider.resolve(&dir)?.is_directory);
        assert!(matches!(
            provider.resolve("mem://root/999"),
            Err(StorageError::NotFound { .. })
        ));
        Ok(())
    }

    #[test]
    fn list_children_requires_directory() -> Result<()> {
        let provider = MemoryProvider::new();
        let file = provider.add_file(provider.root_uri(), "a.txt", b"a")?;
        provider.add_dir(provider.root_uri(), "b")?;

        let entries = provider.list_children(provider.root_uri())?;
        assert_eq!(entries.len(), 2);
        assert!(entries[0].is_directory);
        assert_eq!(entries[1].size, 1);
        assert!(matches!(
            provider.list_children(&file),
            Err(StorageError::InvalidDirectory { .. })
        ));
        Ok(())
    }

    #[test]
    fn injected_read_failure_returns_prefix_then_error() -> Result<()> {
        let provider = MemoryProvider::new();
        let file = provider.add_file(provider.root_uri(), "a.bin", &[7; 32])?;
        provider.fail_reads_after(&file, 10);

        let mut reader = provider.open_read(&file)?;
        let mut buffer = [0_u8; 64];
        assert_eq!(reader.read(&mut buffer)?, 10);
        assert!(reader.read(&mut buffer).is_err());
        assert_eq!(provider.open_streams(), 1);
        drop(reader);
        assert_eq!(provider.open_streams(), 0);
        Ok(())
    }

    #[test]
    fn create_document_numbers_duplicates_and_honours_faults() -> Result<()> {
        let provider = MemoryProvider::new();
        let root = provider.root_uri();
        provider.create_document(root, "image/jpeg", "a.jpg")?;
        let second = provider.create_document(root, "image/jpeg", "a.jpg")?;
        assert_eq!(second.name.as_deref(), Some("a (1).jpg"));
        assert_eq!(provider.child_names(root), ["a.jpg", "a (1).jpg"]);

        provider.fail_writes_named("broken.bin");
        let broken = provider.create_document(root, "application/octet-stream", "broken.bin")?;
        let mut writer = provider.open_write(&broken.uri)?;
        assert!(writer.write_all(b"x").is_err());

        let target = provider.add_dir(root, "locked")?;
        provider.deny_create_in(&target);
        assert!(matches!(
            provider.create_document(&target, "text/plain", "x.txt"),
            Err(StorageError::PermissionDenied { .. })
        ));
        Ok(())
    }
}
