//! Subwatch Core - Subscription Entitlement Engine
//!
//! This crate provides the client-side entitlement machinery for Subwatch:
//! - Product catalog: subscription groups and their tiers
//! - Resolution of a validated receipt into active subscriptions at any instant
//! - A refresh orchestrator that fetches, validates, and resolves on a timer
//! - The one-retry record acquisition policy
//!
//! Receipt acquisition and validation are capabilities ([`RecordProvider`],
//! [`ReceiptSource`], [`RecordValidator`]) supplied by the embedding application.

pub mod config;
pub mod error;
pub mod event;
pub mod monitor;
pub mod product;
pub mod provider;
pub mod record;
pub mod resolve;
pub mod validator;

pub use config::{SubwatchConfig, ValidatorKind};
pub use error::{
    CatalogError, MonitorError, ProviderError, RefreshError, ResolveError, ValidatorError,
};
pub use event::{RefreshCallback, RefreshOutcome};
pub use monitor::{MonitorSettings, SubscriptionMonitor};
pub use product::{Catalog, Product, ProductGroup};
pub use provider::{ReceiptSource, RecordProvider, RetryState, RetryingProvider};
pub use record::{Environment, PurchaseLine, PurchaseRecord};
pub use resolve::{resolve, ActiveEntitlements, Subscription};
pub use validator::{RecordValidator, ValidationContext};

/// Subwatch version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
