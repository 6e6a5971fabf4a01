//! Configuration file parsing for .subwatch.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::CatalogError;
use crate::monitor::MonitorSettings;
use crate::product::{Catalog, ProductGroup};
use crate::record::Environment;

pub const CONFIG_FILENAME: &str = ".subwatch.toml";

/// Main configuration structure for .subwatch.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubwatchConfig {
    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub receipt: ReceiptConfig,

    #[serde(default)]
    pub validator: ValidatorConfig,

    /// Product groups, one per subscription offering
    #[serde(default)]
    pub groups: Vec<ProductGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between periodic refreshes
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// Validation environment: "production" or "sandbox"
    #[serde(default)]
    pub environment: Environment,

    /// Upper bound for fetching the receipt, in seconds (0 = default)
    #[serde(default = "default_stage_timeout")]
    pub fetch_timeout_secs: u64,

    /// Upper bound for one validation round trip, in seconds (0 = default)
    #[serde(default = "default_stage_timeout")]
    pub validate_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptConfig {
    /// Where the local receipt lives (relative paths resolve against the config file)
    #[serde(default = "default_receipt_path")]
    pub path: PathBuf,

    /// Where to download a fresh receipt when the local one can't be read
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValidatorKind {
    /// POST the receipt to a validation service
    #[default]
    Http,
    /// Trust the receipt file as an already-validated JSON record
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    #[serde(default)]
    pub kind: ValidatorKind,

    #[serde(default = "default_production_url")]
    pub production_url: String,

    #[serde(default = "default_sandbox_url")]
    pub sandbox_url: String,
}

// Default functions
fn default_refresh_interval() -> u64 {
    3600
}

fn default_stage_timeout() -> u64 {
    30
}

fn default_receipt_path() -> PathBuf {
    PathBuf::from("receipt.json")
}

fn default_production_url() -> String {
    "https://validate.subwatch.dev/v1/receipt".to_string()
}

fn default_sandbox_url() -> String {
    "https://sandbox.validate.subwatch.dev/v1/receipt".to_string()
}

impl Default for SubwatchConfig {
    fn default() -> Self {
        toml::from_str("").expect("empty TOML should parse to defaults")
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval(),
            environment: Environment::default(),
            fetch_timeout_secs: default_stage_timeout(),
            validate_timeout_secs: default_stage_timeout(),
        }
    }
}

impl Default for ReceiptConfig {
    fn default() -> Self {
        Self {
            path: default_receipt_path(),
            refresh_url: None,
        }
    }
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            kind: ValidatorKind::default(),
            production_url: default_production_url(),
            sandbox_url: default_sandbox_url(),
        }
    }
}

impl ValidatorConfig {
    pub fn url_for(&self, environment: Environment) -> &str {
        match environment {
            Environment::Production => &self.production_url,
            Environment::Sandbox => &self.sandbox_url,
        }
    }
}

impl SubwatchConfig {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let mut config: SubwatchConfig =
            toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;

        if config.receipt.path.is_relative() {
            if let Some(dir) = path.parent() {
                config.receipt.path = dir.join(&config.receipt.path);
            }
        }
        Ok(config)
    }

    /// Find and load .subwatch.toml from `start_dir` or its ancestors, then
    /// the user config dir (`~/.config/subwatch/config.toml`).
    pub fn find_and_load(start_dir: &Path) -> Result<Self> {
        let mut current = start_dir;

        loop {
            let config_path = current.join(CONFIG_FILENAME);
            if config_path.exists() {
                return Self::from_file(&config_path);
            }

            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }

        if let Some(user_config) = user_config_path() {
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        // No config found, use defaults
        Ok(Self::default())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Builds the product catalog from the configured groups.
    pub fn catalog(&self) -> std::result::Result<Catalog, CatalogError> {
        Catalog::from_groups(self.groups.iter().cloned())
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            refresh_interval: Duration::from_secs(self.monitor.refresh_interval_secs),
            environment: self.monitor.environment,
            fetch_timeout: Duration::from_secs(self.monitor.fetch_timeout_secs),
            validate_timeout: Duration::from_secs(self.monitor.validate_timeout_secs),
            ..MonitorSettings::default()
        }
    }
}

/// `~/.config/subwatch/config.toml` (platform equivalent)
pub fn user_config_path() -> Option<PathBuf> {
    Some(dirs::config_dir()?.join("subwatch").join("config.toml"))
}
