//! Built-in values used when neither the settings file nor the environment
//! provides one.

/// Block size used by the stream copier (8 KiB).
pub(crate) const BLOCK_SIZE: usize = 8 * 1024;
/// MIME type for sources whose type is unknown.
pub(crate) const FALLBACK_MIME_TYPE: &str = "application/octet-stream";
/// Per-subscriber buffer of the progress channel.
pub(crate) const EVENT_CAPACITY: usize = 256;
/// Directory holding persisted grants, relative to the working directory.
pub(crate) const STATE_DIR: &str = ".otgcopy";
/// Log level when `RUST_LOG` is not provided.
pub(crate) const LOG_LEVEL: &str = "info";
/// Smallest accepted block size.
pub(crate) const MIN_BLOCK_SIZE: usize = 512;
/// Largest accepted block size (16 MiB).
pub(crate) const MAX_BLOCK_SIZE: usize = 16 * 1024 * 1024;
/// Largest accepted progress channel capacity.
pub(crate) const MAX_EVENT_CAPACITY: usize = 65_536;
