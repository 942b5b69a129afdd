//! Layered settings loader.
//!
//! # Design
//! - Precedence, lowest first: built-in defaults, the JSON file named by
//!   `OTGCOPY_CONFIG`, then individual `OTGCOPY_*` variables.
//! - The environment is read through a lookup closure so tests never touch
//!   process-global state.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{CopySettings, LogFormatSetting, SettingsFile};
use crate::validate::validate;

/// Variable naming the optional JSON settings file.
pub const CONFIG_PATH_ENV: &str = "OTGCOPY_CONFIG";

const BLOCK_SIZE_ENV: &str = "OTGCOPY_BLOCK_SIZE";
const FALLBACK_MIME_ENV: &str = "OTGCOPY_FALLBACK_MIME";
const EVENT_CAPACITY_ENV: &str = "OTGCOPY_EVENT_CAPACITY";
const RETAIN_FAILURES_ENV: &str = "OTGCOPY_RETAIN_FAILURES";
const STATE_DIR_ENV: &str = "OTGCOPY_STATE_DIR";
const LOG_LEVEL_ENV: &str = "OTGCOPY_LOG_LEVEL";
const LOG_FORMAT_ENV: &str = "OTGCOPY_LOG_FORMAT";

/// Load settings from the process environment.
///
/// # Errors
///
/// See [`load_with`].
pub fn load_from_env() -> ConfigResult<CopySettings> {
    load_with(|key| std::env::var(key).ok())
}

/// Load settings, resolving variables through `lookup`.
///
/// # Errors
///
/// Returns `Io`/`Json` when the settings file cannot be read or parsed and
/// `InvalidField` when a variable cannot be parsed or the merged settings
/// fail validation.
pub fn load_with<F>(lookup: F) -> ConfigResult<CopySettings>
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = CopySettings::default();
    if let Some(path) = lookup(CONFIG_PATH_ENV).filter(|value| !value.trim().is_empty()) {
        let file = read_settings_file(Path::new(&path))?;
        settings.merge(file);
        debug!(path = %path, "settings file applied");
    }
    apply_env(&mut settings, &lookup)?;
    validate(&settings)?;
    Ok(settings)
}

fn read_settings_file(path: &Path) -> ConfigResult<SettingsFile> {
    let bytes = fs::read(path).map_err(|source| ConfigError::Io {
        operation: "settings.read",
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn apply_env<F>(settings: &mut CopySettings, lookup: &F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(BLOCK_SIZE_ENV) {
        settings.block_size = parse_number("block_size", &value)?;
    }
    if let Some(value) = lookup(FALLBACK_MIME_ENV) {
        settings.fallback_mime_type = value.trim().to_string();
    }
    if let Some(value) = lookup(EVENT_CAPACITY_ENV) {
        settings.event_capacity = parse_number("event_capacity", &value)?;
    }
    if let Some(value) = lookup(RETAIN_FAILURES_ENV) {
        settings.retain_failure_detail = parse_flag("retain_failure_detail", &value)?;
    }
    if let Some(value) = lookup(STATE_DIR_ENV) {
        settings.state_dir = PathBuf::from(value);
    }
    if let Some(value) = lookup(LOG_LEVEL_ENV) {
        settings.log_level = value.trim().to_ascii_lowercase();
    }
    if let Some(value) = lookup(LOG_FORMAT_ENV) {
        settings.log_format = LogFormatSetting::from_str(&value)?;
    }
    Ok(())
}

fn parse_number(field: &'static str, value: &str) -> ConfigResult<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(field, value, "not_a_number"))
}

fn parse_flag(field: &'static str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(field, value, "not_a_flag")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let settings = load_with(env(&[])).expect("defaults load");
        assert_eq!(settings, CopySettings::default());
    }

    #[test]
    fn variables_override_defaults() {
        let settings = load_with(env(&[
            (BLOCK_SIZE_ENV, "65536"),
            (RETAIN_FAILURES_ENV, "off"),
            (LOG_FORMAT_ENV, "json"),
            (LOG_LEVEL_ENV, " DEBUG "),
        ]))
        .expect("overrides load");
        assert_eq!(settings.block_size, 65_536);
        assert!(!settings.retain_failure_detail);
        assert_eq!(settings.log_format, LogFormatSetting::Json);
        assert_eq!(settings.log_level, "debug");
    }

    #[test]
    fn unparsable_number_names_the_field() {
        let err = load_with(env(&[(EVENT_CAPACITY_ENV, "lots")])).expect_err("bad number");
        assert!(matches!(
            err,
            ConfigError::InvalidField {
                field: "event_capacity",
                reason: "not_a_number",
                ..
            }
        ));
    }

    #[test]
    fn out_of_range_values_fail_validation() {
        let err = load_with(env(&[(BLOCK_SIZE_ENV, "16")])).expect_err("too small");
        assert!(matches!(
            err,
            ConfigError::InvalidField {
                field: "block_size",
                ..
            }
        ));
    }

    #[test]
    fn missing_settings_file_is_an_io_error() {
        let err = load_with(env(&[(CONFIG_PATH_ENV, "/nonexistent/otgcopy.json")]))
            .expect_err("missing file");
        assert!(matches!(
            err,
            ConfigError::Io {
                operation: "settings.read",
                ..
            }
        ));
    }
}
