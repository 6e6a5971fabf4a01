//! Watch command — periodic refresh, plus a refresh whenever the receipt changes

use anyhow::Result;
use colored::Colorize;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, DebouncedEventKind, Debouncer};
use std::path::{Path, PathBuf};
use std::time::Duration;
use subwatch_core::{RefreshOutcome, SubscriptionMonitor, SubwatchConfig};
use tokio::sync::{broadcast, mpsc};

use crate::output::{json, terminal};
use crate::sources::{build_monitor_with_source, FileReceiptSource};
use crate::{Cli, OutputFormat};

const DEBOUNCE_MS: u64 = 300;

pub async fn run(config: &SubwatchConfig, cli: &Cli, no_file_watch: bool) -> Result<()> {
    let format = cli.output_format();
    let source = FileReceiptSource::from_config(&config.receipt)?;
    let monitor = build_monitor_with_source(config, cli.sandbox, source.clone())?;
    let mut events = monitor.subscribe();

    if format == OutputFormat::Terminal {
        eprintln!(
            "{}",
            format!(
                "  subwatch v{} — watch mode ({}, every {}s)",
                subwatch_core::VERSION,
                monitor.environment(),
                monitor.refresh_interval().as_secs()
            )
            .bold()
        );
        eprintln!();
    }

    // ── Ctrl-C handler ─────────────────────────────────────────
    let (stop_tx, mut stop_rx) = mpsc::unbounded_channel::<()>();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })?;

    // ── Receipt file watcher ───────────────────────────────────
    let (change_tx, mut change_rx) = mpsc::unbounded_channel::<()>();
    let _debouncer = if no_file_watch {
        drop(change_tx);
        None
    } else {
        Some(watch_receipt(&config.receipt.path, change_tx)?)
    };

    monitor.start_refreshing();
    trigger_refresh(&monitor);

    // ── Event loop ─────────────────────────────────────────────
    loop {
        tokio::select! {
            _ = stop_rx.recv() => break,
            Some(()) = change_rx.recv() => {
                // A refresh rewrites the receipt; only outside edits start a cycle.
                if source.is_own_write().await {
                    tracing::debug!("ignoring receipt write made by a refresh");
                } else {
                    tracing::debug!("receipt file changed");
                    trigger_refresh(&monitor);
                }
            }
            event = events.recv() => match event {
                Ok(outcome) => report(&monitor, &outcome, format)?,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "dropped refresh outcomes");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    monitor.stop_refreshing();
    if format == OutputFormat::Terminal {
        eprintln!();
        eprintln!("  {}", "Stopped watching.".bold());
    }
    Ok(())
}

/// Runs a cycle in the background; its outcome arrives on the event stream.
fn trigger_refresh(monitor: &SubscriptionMonitor) {
    let monitor = monitor.clone();
    tokio::spawn(async move {
        monitor.refresh_now().await;
    });
}

fn report(
    monitor: &SubscriptionMonitor,
    outcome: &RefreshOutcome,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => json::print(&json::JsonOutcome::new(
            outcome,
            monitor.environment(),
            monitor.last_validation_time(),
        )),
        OutputFormat::Terminal => {
            terminal::print_outcome(outcome);
            eprintln!("  {}", "Watching for changes... (Ctrl-C to stop)".dimmed());
            Ok(())
        }
    }
}

/// Watches the receipt's directory and signals on changes to the receipt file.
///
/// The directory is watched rather than the file so a receipt that is created
/// later, or replaced by rename, is still picked up.
fn watch_receipt(
    receipt: &Path,
    changes: mpsc::UnboundedSender<()>,
) -> Result<Debouncer<notify::RecommendedWatcher>> {
    let dir = match receipt.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = receipt.file_name().map(|n| n.to_os_string());

    let mut debouncer = new_debouncer(
        Duration::from_millis(DEBOUNCE_MS),
        move |res: DebounceEventResult| match res {
            Ok(events) => {
                let touched = events.iter().any(|ev| {
                    ev.kind == DebouncedEventKind::Any
                        && ev.path.file_name().map(|n| n.to_os_string()) == file_name
                });
                if touched {
                    let _ = changes.send(());
                }
            }
            Err(e) => tracing::warn!(error = ?e, "receipt watch error"),
        },
    )?;

    use notify::RecursiveMode;
    debouncer
        .watcher()
        .watch(&dir, RecursiveMode::NonRecursive)?;

    tracing::debug!(dir = %dir.display(), "watching receipt directory");
    Ok(debouncer)
}
