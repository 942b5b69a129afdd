//! Validation helpers for resolved settings.

use crate::defaults::{MAX_BLOCK_SIZE, MAX_EVENT_CAPACITY, MIN_BLOCK_SIZE};
use crate::error::{ConfigError, ConfigResult};
use crate::model::CopySettings;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Check every field of `settings`.
///
/// # Errors
///
/// Returns the first [`ConfigError::InvalidField`] encountered.
pub fn validate(settings: &CopySettings) -> ConfigResult<()> {
    validate_block_size(settings.block_size)?;
    validate_event_capacity(settings.event_capacity)?;
    validate_mime_type(&settings.fallback_mime_type)?;
    validate_log_level(&settings.log_level)?;
    if settings.state_dir.as_os_str().is_empty() {
        return Err(ConfigError::InvalidField {
            field: "state_dir",
            value: None,
            reason: "empty",
        });
    }
    Ok(())
}

pub(crate) fn validate_block_size(value: usize) -> ConfigResult<()> {
    if (MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid("block_size", value, "out_of_range"))
    }
}

pub(crate) fn validate_event_capacity(value: usize) -> ConfigResult<()> {
    if (1..=MAX_EVENT_CAPACITY).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid("event_capacity", value, "out_of_range"))
    }
}

pub(crate) fn validate_mime_type(value: &str) -> ConfigResult<()> {
    let valid = value
        .split_once('/')
        .is_some_and(|(kind, subtype)| !kind.is_empty() && !subtype.is_empty())
        && !value.contains(char::is_whitespace);
    if valid {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            "fallback_mime_type",
            value,
            "not_a_mime_type",
        ))
    }
}

pub(crate) fn validate_log_level(value: &str) -> ConfigResult<()> {
    if LOG_LEVELS.contains(&value.to_ascii_lowercase().as_str()) {
        Ok(())
    } else {
        Err(ConfigError::invalid("log_level", value, "unknown_level"))
    }
}
