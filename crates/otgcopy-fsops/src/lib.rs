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

//! Copy engine for user-selected documents.
//!
//! Layout: `copier.rs` (single-document streaming), `engine.rs` (batches,
//! progress events, failure accounting), `selection.rs` (controller-owned
//! selection), `model.rs` (requests and results), `error.rs`.

pub mod copier;
pub mod engine;
pub mod error;
pub mod model;
pub mod selection;

pub use copier::{CopiedItem, DEFAULT_BLOCK_SIZE, StreamCopier};
pub use engine::{CopyEngine, CopyOptions};
pub use error::{CopyError, CopyResult, ItemError};
pub use model::{BatchResult, CopyRequest, ItemFailure};
pub use selection::Selection;
