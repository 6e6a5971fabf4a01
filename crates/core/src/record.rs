//! Validated purchase records (receipts) and their purchase lines

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Validation environment, passed through to the validator untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Sandbox,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Production => write!(f, "production"),
            Environment::Sandbox => write!(f, "sandbox"),
        }
    }
}

/// One purchase of one product.
///
/// The validity window is closed-open: `[purchased_at, end)`, where `end` is
/// the earlier of `expires_at` and `cancelled_at`. No end means indefinite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseLine {
    pub product_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,

    pub purchased_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Refund or revocation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl PurchaseLine {
    pub fn new(
        product_id: impl Into<String>,
        purchased_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            transaction_id: None,
            purchased_at,
            expires_at,
            cancelled_at: None,
        }
    }

    /// End of the validity window, if any.
    pub fn ends_at(&self) -> Option<DateTime<Utc>> {
        match (self.expires_at, self.cancelled_at) {
            (Some(e), Some(c)) => Some(e.min(c)),
            (e, c) => e.or(c),
        }
    }

    /// `purchased_at <= at < end`
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        if at < self.purchased_at {
            return false;
        }
        match self.ends_at() {
            Some(end) => at < end,
            None => true,
        }
    }
}

/// A receipt that has passed validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PurchaseRecord {
    #[serde(default)]
    pub lines: Vec<PurchaseLine>,

    /// Environment the validator reports the receipt came from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<DateTime<Utc>>,

    /// Validator response kept verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl PurchaseRecord {
    pub fn new(lines: Vec<PurchaseLine>) -> Self {
        Self {
            lines,
            ..Default::default()
        }
    }

    /// Lines whose window contains `at`, in record order.
    pub fn active_lines(&self, at: DateTime<Utc>) -> impl Iterator<Item = &PurchaseLine> {
        self.lines.iter().filter(move |l| l.is_active_at(at))
    }
}
