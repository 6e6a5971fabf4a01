//! Progress indicators

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// A single CLI step backed by an indicatif spinner.
///
/// Create with [`Step::new`], then call [`Step::finish`] or [`Step::fail`]
/// when the work completes. On a non-TTY the spinner draws nothing, but the
/// finish lines are still emitted via `eprintln!`. A [`Step::quiet`] step
/// prints nothing at all, for machine-readable output modes.
pub struct Step {
    pb: ProgressBar,
    label: String,
    quiet: bool,
}

impl Step {
    /// Start a new spinner step with the given label.
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("  {spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("{}...", label));
        pb.enable_steady_tick(Duration::from_millis(80));
        Self {
            pb,
            label,
            quiet: false,
        }
    }

    /// A step that draws and prints nothing.
    pub fn quiet(label: impl Into<String>) -> Self {
        Self {
            pb: ProgressBar::hidden(),
            label: label.into(),
            quiet: true,
        }
    }

    /// Pick [`Step::new`] or [`Step::quiet`].
    pub fn with_visibility(label: impl Into<String>, visible: bool) -> Self {
        if visible {
            Self::new(label)
        } else {
            Self::quiet(label)
        }
    }

    /// Finish successfully: prints `"  label... done — {summary}"`.
    pub fn finish(&self, summary: &str) {
        self.pb.finish_and_clear();
        if !self.quiet {
            eprintln!("  {}... {} — {}", self.label, "done".green(), summary);
        }
    }

    /// Finish with an error: prints `"  label... failed — {reason}"`.
    pub fn fail(&self, reason: impl std::fmt::Display) {
        self.pb.finish_and_clear();
        if !self.quiet {
            eprintln!("  {}... {} — {}", self.label, "failed".red(), reason);
        }
    }
}
