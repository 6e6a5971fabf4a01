//! Products, product groups, and the catalog that indexes them
//!
//! A product group is one subscription offering (e.g. Basic/Pro/Enterprise).
//! Its products are mutually exclusive tiers: at most one of them is active
//! for the group at any time. Tier precedence uses [`Product::level`], where
//! a **lower** level is **more valuable** (level 1 outranks level 2).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};

use crate::error::CatalogError;

/// A purchasable tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Store product identifier (unique across the catalog)
    pub id: String,

    /// Tier level; lower is more valuable
    #[serde(default)]
    pub level: u32,

    /// Free tier: granted without any purchase
    #[serde(default)]
    pub always_active: bool,

    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Product {
    /// A paid product at the given tier level.
    pub fn new(id: impl Into<String>, level: u32) -> Self {
        Self {
            id: id.into(),
            level,
            always_active: false,
            name: None,
        }
    }

    /// A free product that is active without a purchase.
    pub fn free(id: impl Into<String>, level: u32) -> Self {
        Self {
            always_active: true,
            ..Self::new(id, level)
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns `true` if this product is strictly more valuable than `other`.
    pub fn outranks(&self, other: &Product) -> bool {
        self.level < other.level
    }

    /// Display name, falling back to the identifier.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// A set of mutually exclusive products. Identity is the group id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductGroup {
    pub id: String,

    #[serde(default)]
    pub products: Vec<Product>,
}

impl ProductGroup {
    pub fn new(id: impl Into<String>, products: Vec<Product>) -> Self {
        Self {
            id: id.into(),
            products,
        }
    }

    pub fn product(&self, product_id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == product_id)
    }

    pub fn always_active_products(&self) -> impl Iterator<Item = &Product> {
        self.products.iter().filter(|p| p.always_active)
    }
}

impl PartialEq for ProductGroup {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ProductGroup {}

impl Hash for ProductGroup {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Configured product groups plus the derived product → group index.
///
/// The index is rebuilt from scratch on every add/remove, so it never drifts
/// from the group set.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    groups: BTreeMap<String, ProductGroup>,
    index: HashMap<String, String>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from a list of groups, rejecting conflicting products.
    pub fn from_groups(
        groups: impl IntoIterator<Item = ProductGroup>,
    ) -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        for group in groups {
            catalog.add_group(group)?;
        }
        Ok(catalog)
    }

    /// Inserts a group, replacing any existing group with the same id.
    ///
    /// Fails if one of the group's products is already owned by a different
    /// group; the catalog is left unchanged in that case.
    pub fn add_group(&mut self, group: ProductGroup) -> Result<(), CatalogError> {
        if group.id.trim().is_empty() {
            return Err(CatalogError::EmptyGroupId);
        }
        for product in &group.products {
            if let Some(owner) = self.index.get(&product.id) {
                if *owner != group.id {
                    return Err(CatalogError::DuplicateProduct {
                        product: product.id.clone(),
                        group: owner.clone(),
                    });
                }
            }
        }

        self.groups.insert(group.id.clone(), group);
        self.rebuild_index();
        Ok(())
    }

    /// Removes a group by id, returning it if present.
    pub fn remove_group(&mut self, group_id: &str) -> Option<ProductGroup> {
        let removed = self.groups.remove(group_id);
        if removed.is_some() {
            self.rebuild_index();
        }
        removed
    }

    pub fn group(&self, group_id: &str) -> Option<&ProductGroup> {
        self.groups.get(group_id)
    }

    /// Returns the group owning `product_id`.
    pub fn group_for_product(&self, product_id: &str) -> Option<&ProductGroup> {
        self.index
            .get(product_id)
            .and_then(|group_id| self.groups.get(group_id))
    }

    /// Returns the product with the given id, wherever it lives.
    pub fn product(&self, product_id: &str) -> Option<&Product> {
        self.group_for_product(product_id)
            .and_then(|g| g.product(product_id))
    }

    /// Groups in id order.
    pub fn groups(&self) -> impl Iterator<Item = &ProductGroup> {
        self.groups.values()
    }

    /// The product-id → group-id index.
    pub fn index(&self) -> &HashMap<String, String> {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .groups
            .values()
            .flat_map(|g| g.products.iter().map(move |p| (p.id.clone(), g.id.clone())))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lower_level_outranks_higher() {
        let pro = Product::new("pro", 1);
        let basic = Product::new("basic", 2);
        assert!(pro.outranks(&basic));
        assert!(!basic.outranks(&pro));
        assert!(!pro.outranks(&pro.clone()));
    }

    #[test]
    fn group_equality_is_by_id() {
        let a = ProductGroup::new("plan", vec![Product::new("a", 1)]);
        let b = ProductGroup::new("plan", vec![]);
        assert_eq!(a, b);
    }

    #[test]
    fn label_falls_back_to_id() {
        assert_eq!(Product::new("x.pro", 1).label(), "x.pro");
        assert_eq!(Product::new("x.pro", 1).with_name("Pro").label(), "Pro");
    }
}
