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

//! Runtime settings for the copy engine and its front-ends.
//!
//! Layout: `defaults.rs` (built-in values), `model.rs` (typed settings and the
//! on-disk document), `loader.rs` (defaults → JSON file → environment),
//! `validate.rs` (range and format checks), `error.rs`.

mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{CONFIG_PATH_ENV, load_from_env, load_with};
pub use model::{CopySettings, LogFormatSetting, SettingsFile};
