//! Argument parsing and command dispatch for `otgcopy`.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use otgcopy_config::{CopySettings, LogFormatSetting, load_from_env};
use otgcopy_storage::DateRange;
use otgcopy_telemetry::{LogFormat, LoggingConfig, init_logging};
use tracing::debug;

use crate::commands::copy::handle_copy;
use crate::commands::grants::{handle_grant, handle_grants};
use crate::commands::ls::handle_ls;
use crate::context::{AppContext, CliError, CliResult};

/// Parses CLI arguments, executes the requested command, and reports
/// failures on stderr. Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let result = match settings_for(&cli) {
        Ok(settings) => {
            install_logging(&settings);
            let ctx = AppContext {
                settings,
                output: cli.output,
            };
            dispatch(cli.command, &ctx).await
        }
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

async fn dispatch(command: Command, ctx: &AppContext) -> CliResult<()> {
    match command {
        Command::Grant(args) => handle_grant(ctx, args),
        Command::Grants => handle_grants(ctx),
        Command::Ls(args) => handle_ls(ctx, &args),
        Command::Copy(args) => handle_copy(ctx, args).await,
    }
}

fn settings_for(cli: &Cli) -> CliResult<CopySettings> {
    let mut settings = load_from_env().map_err(CliError::failure)?;
    if let Some(state_dir) = &cli.state_dir {
        settings.state_dir.clone_from(state_dir);
    }
    Ok(settings)
}

fn install_logging(settings: &CopySettings) {
    let format = match settings.log_format {
        LogFormatSetting::Auto => LogFormat::infer(),
        LogFormatSetting::Json => LogFormat::Json,
        LogFormatSetting::Pretty => LogFormat::Pretty,
    };
    let config = LoggingConfig {
        level: &settings.log_level,
        format,
        build_sha: env!("CARGO_PKG_VERSION"),
    };
    if let Err(err) = init_logging(&config) {
        eprintln!("warning: logging disabled: {err}");
    } else {
        debug!(state_dir = %settings.state_dir.display(), "settings loaded");
    }
}

#[derive(Parser)]
#[command(
    name = "otgcopy",
    about = "Browse granted USB storage trees and copy files out of them"
)]
pub(crate) struct Cli {
    #[arg(long, global = true, env = "OTGCOPY_STATE_DIR")]
    state_dir: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        value_enum,
        env = "OTGCOPY_OUTPUT",
        default_value_t = OutputFormat::Table
    )]
    output: OutputFormat,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Grant access to a directory tree.
    Grant(GrantArgs),
    /// List granted trees.
    Grants,
    /// List the entries of a granted directory.
    Ls(LsArgs),
    /// Copy files into a granted directory.
    Copy(CopyArgs),
}

#[derive(Args, Default)]
pub(crate) struct GrantArgs {
    #[arg(help = "Directory to grant; omitting it cancels the request")]
    pub(crate) path: Option<PathBuf>,
}

#[derive(Args, Clone, Copy, Default)]
pub(crate) struct DateArgs {
    #[arg(long, help = "Only entries modified on or after this day (YYYY-MM-DD)")]
    pub(crate) since: Option<NaiveDate>,
    #[arg(long, help = "Only entries modified on or before this day (YYYY-MM-DD)")]
    pub(crate) until: Option<NaiveDate>,
}

impl DateArgs {
    pub(crate) fn range(self) -> CliResult<DateRange> {
        if let (Some(since), Some(until)) = (self.since, self.until) {
            if since > until {
                return Err(CliError::validation("--since must not be after --until"));
            }
        }
        Ok(DateRange::new(self.since, self.until))
    }
}

#[derive(Args, Default)]
pub(crate) struct LsArgs {
    #[arg(help = "Tree or folder URI")]
    pub(crate) tree: String,
    #[command(flatten)]
    pub(crate) dates: DateArgs,
}

#[derive(Args, Default)]
pub(crate) struct CopyArgs {
    #[arg(help = "Source document URIs, copied in order")]
    pub(crate) sources: Vec<String>,
    #[arg(long, help = "Destination folder URI")]
    pub(crate) to: String,
    #[arg(
        long,
        help = "Select every file directly inside this folder, honouring --since/--until"
    )]
    pub(crate) all_from: Option<String>,
    #[command(flatten)]
    pub(crate) dates: DateArgs,
    #[arg(long, help = "Print every progress event as a JSON line")]
    pub(crate) events: bool,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn copy_accepts_many_sources_and_flags() {
        let cli = Cli::try_parse_from([
            "otgcopy",
            "copy",
            "file:///a",
            "file:///b",
            "--to",
            "file:///out",
            "--events",
            "--since",
            "2024-03-01",
        ])
        .expect("valid arguments");
        let Command::Copy(args) = cli.command else {
            panic!("expected copy command");
        };
        assert_eq!(args.sources, ["file:///a", "file:///b"]);
        assert_eq!(args.to, "file:///out");
        assert!(args.events);
        assert_eq!(args.dates.since, NaiveDate::from_ymd_opt(2024, 3, 1));
    }

    #[test]
    fn ls_rejects_malformed_dates() {
        assert!(Cli::try_parse_from(["otgcopy", "ls", "file:///a", "--since", "yesterday"]).is_err());
    }

    #[test]
    fn inverted_date_window_is_a_validation_error() {
        let dates = DateArgs {
            since: NaiveDate::from_ymd_opt(2024, 5, 2),
            until: NaiveDate::from_ymd_opt(2024, 5, 1),
        };
        assert!(matches!(dates.range(), Err(CliError::Validation(_))));
    }

    #[test]
    fn output_defaults_to_table() {
        let cli = Cli::try_parse_from(["otgcopy", "grants"]).expect("valid arguments");
        assert_eq!(cli.output, OutputFormat::Table);
    }
}
