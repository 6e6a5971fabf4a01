//! Receipt sources and validators for the subwatch CLI
//!
//! The core library only knows the capabilities. This module holds the
//! concrete collaborators the CLI wires into a monitor:
//! - [`FileReceiptSource`]: receipt on disk, optionally re-downloaded on demand
//! - [`HttpValidator`]: remote validation service
//! - [`LocalValidator`]: trusts the receipt file as an already-validated record

pub mod file;
pub mod http;
pub mod local;
pub mod machine;

pub use file::FileReceiptSource;
pub use http::HttpValidator;
pub use local::LocalValidator;

use anyhow::{Context, Result};
use std::sync::Arc;
use subwatch_core::{
    Environment, RecordValidator, RetryingProvider, SubscriptionMonitor, SubwatchConfig,
    ValidatorKind,
};

/// Builds a monitor from a loaded config.
///
/// `sandbox` overrides the configured environment. The monitor is returned
/// idle: no refresh runs until the caller asks for one.
pub fn build_monitor(config: &SubwatchConfig, sandbox: bool) -> Result<SubscriptionMonitor> {
    let source = FileReceiptSource::from_config(&config.receipt)?;
    build_monitor_with_source(config, sandbox, source)
}

/// Like [`build_monitor`], reading the receipt through `source`.
pub fn build_monitor_with_source(
    config: &SubwatchConfig,
    sandbox: bool,
    source: FileReceiptSource,
) -> Result<SubscriptionMonitor> {
    let mut settings = config.monitor_settings();
    if sandbox {
        settings.environment = Environment::Sandbox;
    }

    let catalog = config
        .catalog()
        .context("Invalid product groups in configuration")?;

    let provider = Arc::new(RetryingProvider::new(source));

    let validator: Arc<dyn RecordValidator> = match config.validator.kind {
        ValidatorKind::Http => Arc::new(HttpValidator::from_config(&config.validator)?),
        ValidatorKind::Local => Arc::new(LocalValidator),
    };

    Ok(SubscriptionMonitor::with_settings(provider, validator, settings).with_catalog(catalog))
}
