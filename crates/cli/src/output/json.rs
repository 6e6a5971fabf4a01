//! JSON output formatting

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use subwatch_core::{ActiveEntitlements, Catalog, Environment, RefreshOutcome};

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonOutcome {
    pub cycle: u64,
    pub success: bool,
    pub environment: Environment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validated_at: Option<DateTime<Utc>>,
    pub subscriptions: Vec<JsonSubscription>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonSnapshot {
    pub at: DateTime<Utc>,
    /// Absent when the receipt could not be resolved against the catalog
    pub subscriptions: Option<Vec<JsonSubscription>>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct JsonSubscription {
    pub group: String,
    pub product: String,
    pub level: u32,
    pub free: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonGroup {
    pub id: String,
    pub products: Vec<JsonProduct>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonProduct {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub level: u32,
    pub free: bool,
}

pub fn subscriptions(active: &ActiveEntitlements) -> Vec<JsonSubscription> {
    active
        .iter()
        .map(|(group, sub)| JsonSubscription {
            group: group.to_string(),
            product: sub.product.id.clone(),
            level: sub.product.level,
            free: sub.is_free(),
            transaction_id: sub.line.as_ref().and_then(|l| l.transaction_id.clone()),
            expires_at: sub.expires_at(),
        })
        .collect()
}

impl JsonOutcome {
    pub fn new(
        outcome: &RefreshOutcome,
        environment: Environment,
        validated_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            cycle: outcome.cycle,
            success: outcome.is_success(),
            environment,
            validated_at,
            subscriptions: outcome.active.as_ref().map(subscriptions).unwrap_or_default(),
            error: outcome.error.as_ref().map(|e| e.to_string()),
        }
    }
}

pub fn groups(catalog: &Catalog) -> Vec<JsonGroup> {
    catalog
        .groups()
        .map(|group| JsonGroup {
            id: group.id.clone(),
            products: group
                .products
                .iter()
                .map(|p| JsonProduct {
                    id: p.id.clone(),
                    name: p.name.clone(),
                    level: p.level,
                    free: p.always_active,
                })
                .collect(),
        })
        .collect()
}

/// Prints any serializable value as pretty JSON on stdout.
pub fn print<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
