//! Shared settings, error types, and provider wiring for the CLI.

use std::fmt::{self, Display, Formatter};

use anyhow::anyhow;
use otgcopy_config::CopySettings;
use otgcopy_fsops::CopyError;
use otgcopy_storage::{GrantStore, PickerError};

use crate::cli::OutputFormat;

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<CopyError> for CliError {
    fn from(error: CopyError) -> Self {
        match error {
            CopyError::InvalidInput { .. } => Self::validation("no files selected to copy"),
            CopyError::InvalidTarget { uri, reason, .. } if reason == "not_a_directory" => {
                Self::validation(format!("destination is not a folder: {uri}"))
            }
            other => Self::failure(other),
        }
    }
}

impl From<PickerError> for CliError {
    fn from(error: PickerError) -> Self {
        Self::failure(error)
    }
}

/// Application context passed to command handlers.
#[derive(Debug, Clone)]
pub(crate) struct AppContext {
    pub(crate) settings: CopySettings,
    pub(crate) output: OutputFormat,
}

impl AppContext {
    /// Open the grant store under the configured state directory.
    pub(crate) fn grant_store(&self) -> CliResult<GrantStore> {
        GrantStore::open(&self.settings.state_dir).map_err(|err| {
            CliError::failure(anyhow!(
                "failed to read grants from {}: {err}",
                self.settings.state_dir.display()
            ))
        })
    }
}
