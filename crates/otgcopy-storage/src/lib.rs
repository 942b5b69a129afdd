#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Document-tree access for USB mass storage.
//!
//! Nodes are addressed by opaque URIs handed out by a [`DocumentProvider`];
//! callers never derive hierarchy from a URI's text. Access is scoped to trees
//! the user granted through a [`TreePicker`].
//!
//! Layout: `model.rs` (document values), `provider.rs` (provider trait and
//! naming helpers), `local.rs` (host filesystem trees), `memory.rs` (in-memory
//! trees with fault injection), `grants.rs` (persisted grants and pickers),
//! `filter.rs` (modification-date filtering), `error.rs`.

pub mod error;
pub mod filter;
pub mod grants;
pub mod local;
pub mod memory;
pub mod model;
pub mod provider;

pub use error::{PickerError, StorageError, StorageResult};
pub use filter::DateRange;
pub use grants::{GrantStore, PathPicker, TreePicker};
pub use local::LocalTreeProvider;
pub use memory::MemoryProvider;
pub use model::{DocumentEntry, DocumentRef};
pub use provider::{DEFAULT_MIME_TYPE, DocumentProvider, guess_mime_type};
