//! Output renderers and formatting helpers for CLI commands.

use anyhow::anyhow;
use chrono::Local;
use otgcopy_events::EventEnvelope;
use otgcopy_fsops::BatchResult;
use otgcopy_storage::DocumentEntry;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::context::{CliError, CliResult};

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

pub(crate) fn render_grant(uri: &str, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({ "tree": uri })),
        OutputFormat::Table => {
            println!("granted: {uri}");
            Ok(())
        }
    }
}

pub(crate) fn render_grants(trees: &[String], format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(trees),
        OutputFormat::Table => {
            if trees.is_empty() {
                println!("no trees granted; run `otgcopy grant <path>`");
            }
            for tree in trees {
                println!("{tree}");
            }
            Ok(())
        }
    }
}

pub(crate) fn render_entries(entries: &[DocumentEntry], format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(entries),
        OutputFormat::Table => {
            println!("{:<4} {:>12} {:<16} NAME", "TYPE", "SIZE", "MODIFIED");
            for entry in entries {
                let (kind, size) = if entry.is_directory {
                    ("dir", "-".to_string())
                } else {
                    ("file", format_bytes(entry.size))
                };
                println!(
                    "{:<4} {:>12} {:<16} {}",
                    kind,
                    size,
                    format_modified(entry),
                    entry.name
                );
            }
            Ok(())
        }
    }
}

pub(crate) fn render_batch(
    result: &BatchResult,
    bytes_copied: u64,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(result),
        OutputFormat::Table => {
            println!(
                "Successfully copied {} files ({})",
                result.success_count,
                format_bytes(bytes_copied)
            );
            if result.failed_count() > 0 {
                println!("{} of {} files failed", result.failed_count(), result.total);
                for failure in &result.failures {
                    println!("  [{}] {}: {}", failure.index, failure.uri, failure.reason);
                }
            }
            Ok(())
        }
    }
}

pub(crate) fn render_event_line(envelope: &EventEnvelope) -> CliResult<()> {
    let text = serde_json::to_string(envelope)
        .map_err(|err| CliError::failure(anyhow!("failed to format event: {err}")))?;
    println!("{text}");
    Ok(())
}

fn format_modified(entry: &DocumentEntry) -> String {
    entry.modified_at().map_or_else(
        || "-".to_string(),
        |instant| {
            instant
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        },
    )
}

#[must_use]
pub(crate) fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;
    let value = bytes_to_f64(bytes);
    if value >= GIB {
        format!("{:.2} GiB", value / GIB)
    } else if value >= MIB {
        format!("{:.2} MiB", value / MIB)
    } else if value >= KIB {
        format!("{:.2} KiB", value / KIB)
    } else {
        format!("{bytes} B")
    }
}

fn bytes_to_f64(value: u64) -> f64 {
    let high = u32::try_from(value >> 32).unwrap_or(u32::MAX);
    let low = u32::try_from(value & 0xFFFF_FFFF).unwrap_or(u32::MAX);
    f64::from(high) * 4_294_967_296.0 + f64::from(low)
}
