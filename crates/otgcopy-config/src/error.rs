//! Error types for configuration loading.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Field that failed validation.
        field: &'static str,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// The settings file could not be read.
    #[error("failed to read settings file")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Path of the settings file.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// The settings file was not a valid settings document.
    #[error("failed to parse settings file")]
    Json {
        /// Path of the settings file.
        path: PathBuf,
        /// Source JSON error.
        source: serde_json::Error,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, value: impl ToString, reason: &'static str) -> Self {
        Self::InvalidField {
            field,
            value: Some(value.to_string()),
            reason,
        }
    }
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
