//! Status command — one refresh cycle, then report

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::process::ExitCode;
use subwatch_core::SubwatchConfig;

use crate::output::{json, terminal};
use crate::progress::Step;
use crate::sources::build_monitor;
use crate::{Cli, OutputFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusExitCode {
    Success,
    /// The cycle delivered an error (no receipt, rejected, unknown product)
    CycleFailed,
}

impl From<StatusExitCode> for ExitCode {
    fn from(code: StatusExitCode) -> Self {
        match code {
            StatusExitCode::Success => ExitCode::SUCCESS,
            StatusExitCode::CycleFailed => ExitCode::from(1),
        }
    }
}

pub async fn run(
    config: &SubwatchConfig,
    cli: &Cli,
    at: Option<DateTime<Utc>>,
) -> Result<StatusExitCode> {
    let format = cli.output_format();
    let monitor = build_monitor(config, cli.sandbox)?;

    let step = Step::with_visibility(
        format!("Validating receipt ({})", monitor.environment()),
        format == OutputFormat::Terminal,
    );
    let outcome = monitor.refresh_now().await;
    match &outcome.error {
        None => step.finish(&format!(
            "{} subscription(s)",
            outcome.active.as_ref().map_or(0, |a| a.len())
        )),
        Some(e) => step.fail(e),
    }

    match (at, format) {
        (Some(at), OutputFormat::Json) => {
            let snapshot = monitor.snapshot_entitlements(at);
            json::print(&json::JsonSnapshot {
                at,
                subscriptions: snapshot.as_ref().map(json::subscriptions),
            })?;
        }
        (Some(at), OutputFormat::Terminal) => {
            terminal::print_snapshot(at, monitor.snapshot_entitlements(at).as_ref());
        }
        (None, OutputFormat::Json) => json::print(&json::JsonOutcome::new(
            &outcome,
            monitor.environment(),
            monitor.last_validation_time(),
        ))?,
        (None, OutputFormat::Terminal) => terminal::print_outcome(&outcome),
    }

    Ok(if outcome.is_success() {
        StatusExitCode::Success
    } else {
        StatusExitCode::CycleFailed
    })
}
