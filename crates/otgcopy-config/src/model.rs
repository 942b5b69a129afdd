//! Typed settings and the on-disk settings document.
//!
//! # Design
//! - `CopySettings` is the resolved, validated view handed to services.
//! - `SettingsFile` mirrors the JSON document; every field is optional so a
//!   file only needs to name what it overrides.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::ConfigError;

/// Output format requested for logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormatSetting {
    /// Pretty in debug builds, JSON in release builds.
    #[default]
    Auto,
    /// Structured JSON lines.
    Json,
    /// Human-readable output.
    Pretty,
}

impl FromStr for LogFormatSetting {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            _ => Err(ConfigError::invalid("log_format", value, "unknown_format")),
        }
    }
}

/// Resolved settings for the copy engine and CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopySettings {
    /// Bytes moved per read/write cycle by the stream copier.
    pub block_size: usize,
    /// MIME type for destination entries whose source type is unknown.
    pub fallback_mime_type: String,
    /// Per-subscriber buffer of the progress channel.
    pub event_capacity: usize,
    /// Keep per-item failure detail in batch results.
    pub retain_failure_detail: bool,
    /// Directory holding persisted tree grants.
    pub state_dir: PathBuf,
    /// Log level used when `RUST_LOG` is absent.
    pub log_level: String,
    /// Log output format.
    pub log_format: LogFormatSetting,
}

impl Default for CopySettings {
    fn default() -> Self {
        Self {
            block_size: defaults::BLOCK_SIZE,
            fallback_mime_type: defaults::FALLBACK_MIME_TYPE.to_string(),
            event_capacity: defaults::EVENT_CAPACITY,
            retain_failure_detail: true,
            state_dir: PathBuf::from(defaults::STATE_DIR),
            log_level: defaults::LOG_LEVEL.to_string(),
            log_format: LogFormatSetting::Auto,
        }
    }
}

/// JSON settings document. Absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsFile {
    /// Override for [`CopySettings::block_size`].
    pub block_size: Option<usize>,
    /// Override for [`CopySettings::fallback_mime_type`].
    pub fallback_mime_type: Option<String>,
    /// Override for [`CopySettings::event_capacity`].
    pub event_capacity: Option<usize>,
    /// Override for [`CopySettings::retain_failure_detail`].
    pub retain_failure_detail: Option<bool>,
    /// Override for [`CopySettings::state_dir`].
    pub state_dir: Option<PathBuf>,
    /// Override for [`CopySettings::log_level`].
    pub log_level: Option<String>,
    /// Override for [`CopySettings::log_format`].
    pub log_format: Option<LogFormatSetting>,
}

impl CopySettings {
    /// Overlay the fields present in `file`.
    pub fn merge(&mut self, file: SettingsFile) {
        let SettingsFile {
            block_size,
            fallback_mime_type,
            event_capacity,
            retain_failure_detail,
            state_dir,
            log_level,
            log_format,
        } = file;
        if let Some(value) = block_size {
            self.block_size = value;
        }
        if let Some(value) = fallback_mime_type {
            self.fallback_mime_type = value;
        }
        if let Some(value) = event_capacity {
            self.event_capacity = value;
        }
        if let Some(value) = retain_failure_detail {
            self.retain_failure_detail = value;
        }
        if let Some(value) = state_dir {
            self.state_dir = value;
        }
        if let Some(value) = log_level {
            self.log_level = value;
        }
        if let Some(value) = log_format {
            self.log_format = value;
        }
    }
}
