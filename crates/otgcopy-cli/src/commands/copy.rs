use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use otgcopy_events::topics::COPY_PROGRESS;
use otgcopy_events::{Event, EventBus, EventStream, Subscription};
use otgcopy_fsops::{CopyEngine, CopyOptions, CopyRequest, Selection};
use otgcopy_storage::{DocumentProvider, LocalTreeProvider};
use otgcopy_telemetry::Metrics;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use crate::cli::CopyArgs;
use crate::context::{AppContext, CliError, CliResult};
use crate::output::{render_batch, render_event_line};

const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

pub(crate) async fn handle_copy(ctx: &AppContext, args: CopyArgs) -> CliResult<()> {
    let provider = ctx.grant_store()?.provider();
    let request = build_request(&provider, &args)?;
    let total = request.sources.len();

    let metrics = Metrics::new().map_err(CliError::failure)?;
    let engine = CopyEngine::with_options(
        Arc::new(provider),
        EventBus::with_capacity(ctx.settings.event_capacity),
        CopyOptions::from(&ctx.settings),
    )
    .with_metrics(metrics.clone());

    let result = if args.events {
        let printer = spawn_event_printer(engine.events().subscribe());
        let outcome = engine.copy(request).await;
        finish_event_printer(printer, outcome.is_ok()).await;
        outcome?
    } else {
        let (progress, mut handled) = progress_line(engine.events(), total);
        let outcome = engine.copy(request).await;
        if outcome.is_ok() {
            let _ = tokio::time::timeout(DRAIN_TIMEOUT, handled.wait_for(|seen| *seen >= total))
                .await;
            eprintln!();
        }
        drop(progress);
        outcome?
    };

    let snapshot = metrics.snapshot();
    debug!(
        bytes = snapshot.bytes_copied,
        failed = snapshot.items_failed,
        "copy command finished"
    );
    render_batch(&result, snapshot.bytes_copied, ctx.output)
}

/// Explicit sources first, then every file of `--all-from` that passes the
/// date window.
fn build_request(provider: &LocalTreeProvider, args: &CopyArgs) -> CliResult<CopyRequest> {
    let mut sources = args.sources.clone();
    if let Some(folder) = &args.all_from {
        let range = args.dates.range()?;
        let entries = provider.list_children(folder).map_err(CliError::failure)?;
        let mut selection = Selection::new();
        selection.select_files(&range.apply(&entries));
        sources.extend(selection.iter().map(str::to_string));
    } else if args.dates.since.is_some() || args.dates.until.is_some() {
        return Err(CliError::validation(
            "--since/--until only apply together with --all-from",
        ));
    }
    Ok(CopyRequest {
        sources,
        destination: args.to.clone(),
    })
}

/// Live `[n/total] name` line on stderr driven by the progress subscription.
fn progress_line(events: &EventBus, total: usize) -> (Subscription, watch::Receiver<usize>) {
    let (seen_tx, seen_rx) = watch::channel(0_usize);
    let subscription = events.listen(COPY_PROGRESS, move |envelope| {
        if let Some(progress) = envelope.event.progress() {
            let position = progress.handled + 1;
            let mut stderr = io::stderr().lock();
            let _ = write!(
                stderr,
                "\r[{position}/{}] {}",
                progress.total, progress.current_file
            );
            let _ = stderr.flush();
            seen_tx.send_replace(position);
        }
    });
    debug!(total, kind = subscription.kind(), "progress subscription active");
    (subscription, seen_rx)
}

fn spawn_event_printer(mut stream: EventStream) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(item) = stream.next().await {
            match item {
                Ok(envelope) => {
                    let done = matches!(envelope.event, Event::CopyCompleted { .. });
                    if let Err(err) = render_event_line(&envelope) {
                        warn!(error = %err.display_message(), "failed to print event");
                    }
                    if done {
                        break;
                    }
                }
                Err(err) => warn!(error = %err, "event stream lagged"),
            }
        }
    })
}

async fn finish_event_printer(printer: JoinHandle<()>, batch_ran: bool) {
    if !batch_ran {
        printer.abort();
        return;
    }
    let abort = printer.abort_handle();
    if tokio::time::timeout(DRAIN_TIMEOUT, printer).await.is_err() {
        abort.abort();
        warn!("event printer did not finish; remaining events skipped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{DateArgs, OutputFormat};
    use otgcopy_config::CopySettings;
    use otgcopy_storage::GrantStore;
    use otgcopy_test_support::fixtures::{TempTree, payload};

    fn granted_context(tree: &TempTree, state: &std::path::Path) -> anyhow::Result<AppContext> {
        GrantStore::open(state)?.grant(tree.path())?;
        Ok(AppContext {
            settings: CopySettings {
                state_dir: state.to_path_buf(),
                ..CopySettings::default()
            },
            output: OutputFormat::Json,
        })
    }

    #[tokio::test]
    async fn copies_explicit_sources_into_granted_folder() -> anyhow::Result<()> {
        let state = tempfile::tempdir()?;
        let tree = TempTree::new()?;
        tree.write_file("usb/a.jpg", &payload(9_000))?;
        tree.mkdir("backup")?;
        let ctx = granted_context(&tree, state.path())?;

        let args = CopyArgs {
            sources: vec![tree.uri("usb/a.jpg")?],
            to: tree.uri("backup")?,
            ..CopyArgs::default()
        };
        assert!(handle_copy(&ctx, args).await.is_ok());
        assert_eq!(
            std::fs::read(tree.path().join("backup/a.jpg"))?,
            payload(9_000)
        );
        Ok(())
    }

    #[tokio::test]
    async fn all_from_selects_only_files() -> anyhow::Result<()> {
        let state = tempfile::tempdir()?;
        let tree = TempTree::new()?;
        tree.write_file("usb/a.txt", b"a")?;
        tree.write_file("usb/b.txt", b"b")?;
        tree.mkdir("usb/nested")?;
        tree.mkdir("out")?;
        let ctx = granted_context(&tree, state.path())?;
        let provider = ctx.grant_store()?.provider();

        let args = CopyArgs {
            to: tree.uri("out")?,
            all_from: Some(tree.uri("usb")?),
            events: true,
            ..CopyArgs::default()
        };
        let request = build_request(&provider, &args)?;
        assert_eq!(request.sources.len(), 2);

        assert!(handle_copy(&ctx, args).await.is_ok());
        assert!(tree.path().join("out/a.txt").exists());
        assert!(tree.path().join("out/b.txt").exists());
        assert!(!tree.path().join("out/nested").exists());
        Ok(())
    }

    #[tokio::test]
    async fn nothing_selected_is_a_validation_error() -> anyhow::Result<()> {
        let state = tempfile::tempdir()?;
        let tree = TempTree::new()?;
        tree.mkdir("out")?;
        let ctx = granted_context(&tree, state.path())?;

        let args = CopyArgs {
            to: tree.uri("out")?,
            ..CopyArgs::default()
        };
        assert!(matches!(
            handle_copy(&ctx, args).await,
            Err(CliError::Validation(_))
        ));
        Ok(())
    }

    #[test]
    fn date_window_without_all_from_is_rejected() -> anyhow::Result<()> {
        let tree = TempTree::new()?;
        let args = CopyArgs {
            sources: vec![tree.uri("a")?],
            to: tree.uri("")?,
            dates: DateArgs {
                since: chrono::NaiveDate::from_ymd_opt(2024, 1, 1),
                until: None,
            },
            ..CopyArgs::default()
        };
        assert!(matches!(
            build_request(&tree.provider(), &args),
            Err(CliError::Validation(_))
        ));
        Ok(())
    }
}
