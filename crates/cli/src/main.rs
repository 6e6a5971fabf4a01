//! Subwatch CLI - subscription entitlement monitor

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use subwatch_cli::{commands, Cli, Commands};
use subwatch_core::SubwatchConfig;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // --verbose wins over RUST_LOG; quiet (warn) otherwise
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match &cli.command {
        Commands::Init { path } => commands::init::run(path.as_deref())?,
        Commands::Products => {
            let config = load_config(&cli)?;
            commands::products::run(&config, cli.output_format())?;
        }
        Commands::Status { at } => {
            let config = load_config(&cli)?;
            let code = commands::status::run(&config, &cli, *at).await?;
            return Ok(code.into());
        }
        Commands::Watch { no_file_watch } => {
            let config = load_config(&cli)?;
            commands::watch::run(&config, &cli, *no_file_watch).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn load_config(cli: &Cli) -> Result<SubwatchConfig> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    cli.load_config(&cwd)
}
