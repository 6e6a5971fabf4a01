//! Resolution engine — turns a catalog and a validated receipt into the set of
//! subscriptions active at a given instant

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ResolveError;
use crate::product::{Catalog, Product};
use crate::record::{PurchaseLine, PurchaseRecord};

/// An active entitlement: a product plus the purchase that justifies it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Owning group id
    pub group: String,

    pub product: Product,

    /// Absent for always-active (free) products
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<PurchaseLine>,
}

impl Subscription {
    pub fn is_free(&self) -> bool {
        self.line.is_none()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.line.as_ref().and_then(|l| l.ends_at())
    }
}

/// Group id → the one subscription active for that group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ActiveEntitlements(BTreeMap<String, Subscription>);

impl ActiveEntitlements {
    pub fn get(&self, group_id: &str) -> Option<&Subscription> {
        self.0.get(group_id)
    }

    /// Returns `true` if any group resolved to `product_id`.
    pub fn has_product(&self, product_id: &str) -> bool {
        self.0.values().any(|s| s.product.id == product_id)
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Subscription)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Computes the subscriptions active at `at`.
///
/// Always-active products seed the result. Each receipt line active at `at`
/// then competes for its group: it is installed if the group has no candidate
/// yet, or if its product strictly outranks the current candidate. Equal
/// levels keep the first line seen.
///
/// A line whose product is not in the catalog aborts the whole call with
/// [`ResolveError::UnknownProduct`]. Lines outside their window are skipped
/// before that check, so stale purchases of retired products are harmless.
pub fn resolve(
    catalog: &Catalog,
    record: Option<&PurchaseRecord>,
    at: DateTime<Utc>,
) -> Result<ActiveEntitlements, ResolveError> {
    let mut active: BTreeMap<String, Subscription> = BTreeMap::new();

    for group in catalog.groups() {
        // More than one free product per group is a configuration mistake;
        // the last one listed wins.
        for product in group.always_active_products() {
            active.insert(
                group.id.clone(),
                Subscription {
                    group: group.id.clone(),
                    product: product.clone(),
                    line: None,
                },
            );
        }
    }

    let Some(record) = record else {
        return Ok(ActiveEntitlements(active));
    };

    for line in record.active_lines(at) {
        let (group, product) = catalog
            .group_for_product(&line.product_id)
            .and_then(|g| g.product(&line.product_id).map(|p| (g, p)))
            .ok_or_else(|| ResolveError::UnknownProduct(line.product_id.clone()))?;

        let replace = match active.get(&group.id) {
            None => true,
            Some(current) => product.outranks(&current.product),
        };

        if replace {
            active.insert(
                group.id.clone(),
                Subscription {
                    group: group.id.clone(),
                    product: product.clone(),
                    line: Some(line.clone()),
                },
            );
        }
    }

    Ok(ActiveEntitlements(active))
}
