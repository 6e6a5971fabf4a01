//! Initialize .subwatch.toml configuration

use anyhow::Result;
use std::path::Path;
use subwatch_core::config::CONFIG_FILENAME;
use subwatch_core::{Product, ProductGroup, SubwatchConfig};

pub fn run(path: Option<&Path>) -> Result<()> {
    let target_path = path.unwrap_or_else(|| Path::new("."));
    let config_path = target_path.join(CONFIG_FILENAME);

    if config_path.exists() {
        println!("⚠️  {} already exists at {:?}", CONFIG_FILENAME, config_path);
        return Ok(());
    }

    starter_config().save(&config_path)?;

    println!("✅ Created {} at {:?}", CONFIG_FILENAME, config_path);
    println!("\nDescribe your product groups, point [receipt] at a receipt, and run:");
    println!("  subwatch status");

    Ok(())
}

/// Defaults plus one example group, so the file shows the expected shape.
pub fn starter_config() -> SubwatchConfig {
    let mut config = SubwatchConfig::default();
    config.groups.push(ProductGroup::new(
        "plan",
        vec![
            Product::new("plan.pro", 1).with_name("Pro"),
            Product::new("plan.basic", 2).with_name("Basic"),
            Product::free("plan.free", 3).with_name("Free"),
        ],
    ));
    config
}
