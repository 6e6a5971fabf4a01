//! Subwatch CLI library — exposed for integration tests

pub mod commands;
pub mod output;
pub mod progress;
pub mod sources;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use subwatch_core::SubwatchConfig;

#[derive(Parser)]
#[command(name = "subwatch")]
#[command(about = "Watch a purchase receipt and report the subscriptions it entitles", long_about = None)]
#[command(version = subwatch_core::VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: nearest .subwatch.toml, then the user config)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, global = true)]
    pub format: Option<OutputFormat>,

    /// Validate against the sandbox environment
    #[arg(long, global = true)]
    pub sandbox: bool,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize .subwatch.toml configuration
    Init {
        /// Path to initialize (default: current directory)
        path: Option<PathBuf>,
    },

    /// List configured product groups and their tiers
    Products,

    /// Run one refresh cycle and print the active subscriptions
    Status {
        /// Report entitlements at this instant (RFC 3339) instead of now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// Refresh periodically and print every outcome
    Watch {
        /// Don't refresh when the receipt file changes
        #[arg(long)]
        no_file_watch: bool,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Terminal,
    Json,
}

impl Cli {
    pub fn output_format(&self) -> OutputFormat {
        self.format.unwrap_or_default()
    }

    /// Loads `--config` if given, otherwise searches from `cwd`.
    pub fn load_config(&self, cwd: &Path) -> Result<SubwatchConfig> {
        match &self.config {
            Some(path) => SubwatchConfig::from_file(path),
            None => SubwatchConfig::find_and_load(cwd),
        }
    }
}
