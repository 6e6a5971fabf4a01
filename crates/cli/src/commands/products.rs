//! List the configured catalog

use anyhow::{Context, Result};
use subwatch_core::SubwatchConfig;

use crate::output::{json, terminal};
use crate::OutputFormat;

pub fn run(config: &SubwatchConfig, format: OutputFormat) -> Result<()> {
    let catalog = config
        .catalog()
        .context("Invalid product groups in configuration")?;

    match format {
        OutputFormat::Json => json::print(&json::groups(&catalog))?,
        OutputFormat::Terminal => terminal::print_catalog(&catalog),
    }
    Ok(())
}
