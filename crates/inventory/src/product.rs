use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockbook_core::{DomainError, DomainResult, ProductId};

use crate::stock::{LowStockThreshold, StockLevel};

/// A catalog product as persisted.
///
/// `stock` is the single source of truth for the current quantity. After
/// creation it only changes through a stock adjustment, which always records
/// a matching history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub stock: u32,
    pub brand: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Build a freshly inserted product from its creation request.
    pub fn from_new(id: ProductId, new: NewProduct, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: new.name,
            description: new.description,
            price: new.price,
            stock: new.stock,
            brand: new.brand,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn stock_level(&self, threshold: LowStockThreshold) -> StockLevel {
        StockLevel::classify(self.stock, threshold)
    }

    /// Merge a field patch into this product and refresh `updated_at`.
    ///
    /// The patch is validated first; on error the product is left untouched.
    pub fn apply_patch(&mut self, patch: ProductPatch, now: DateTime<Utc>) -> DomainResult<()> {
        patch.validate()?;

        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(brand) = patch.brand {
            self.brand = brand;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Case-insensitive (ASCII folding) match on name or brand, or exact id.
    ///
    /// Mirrors the SQL used by the SQLite store so both backends agree.
    pub fn matches_search(&self, needle_lower: &str, id: Option<ProductId>) -> bool {
        self.name.to_ascii_lowercase().contains(needle_lower)
            || self.brand.to_ascii_lowercase().contains(needle_lower)
            || id == Some(self.id)
    }
}

/// Request to add a product to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub brand: String,
}

impl NewProduct {
    pub fn new(name: impl Into<String>, price: Decimal) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            price,
            stock: 0,
            brand: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_stock(mut self, stock: u32) -> Self {
        self.stock = stock;
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = brand.into();
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        validate_name(&self.name)?;
        validate_price(self.price)
    }
}

/// Partial update of the descriptive product fields.
///
/// Stock is deliberately absent: it is only changed by a stock adjustment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub brand: Option<String>,
}

impl ProductPatch {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    pub fn brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.brand.is_none()
    }

    pub fn validate(&self) -> DomainResult<()> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::validation("product name cannot be empty"));
    }
    Ok(())
}

fn validate_price(price: Decimal) -> DomainResult<()> {
    if price < Decimal::ZERO {
        return Err(DomainError::validation("price cannot be negative"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget() -> Product {
        let now = Utc::now();
        Product::from_new(
            ProductId::new(1),
            NewProduct::new("Widget", Decimal::new(999, 2))
                .with_stock(5)
                .with_brand("Acme")
                .with_description("A small widget"),
            now,
        )
    }

    #[test]
    fn new_product_requires_a_name() {
        let err = NewProduct::new("   ", Decimal::ONE).validate().unwrap_err();
        assert_eq!(err, DomainError::validation("product name cannot be empty"));
    }

    #[test]
    fn new_product_rejects_negative_price() {
        let err = NewProduct::new("Widget", Decimal::new(-1, 2))
            .validate()
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(NewProduct::new("Free sample", Decimal::ZERO).validate().is_ok());
    }

    #[test]
    fn from_new_keeps_supplied_fields_and_defaults() {
        let now = Utc::now();
        let product = Product::from_new(
            ProductId::new(7),
            NewProduct::new("Bolt", Decimal::new(25, 2)),
            now,
        );
        assert_eq!(product.name, "Bolt");
        assert_eq!(product.description, "");
        assert_eq!(product.brand, "");
        assert_eq!(product.stock, 0);
        assert_eq!(product.created_at, now);
        assert_eq!(product.updated_at, now);
    }

    #[test]
    fn patch_touches_only_given_fields() {
        let mut product = widget();
        let before = product.clone();
        let later = before.updated_at + chrono::Duration::seconds(5);

        product
            .apply_patch(ProductPatch::default().price(Decimal::new(1250, 2)), later)
            .unwrap();

        assert_eq!(product.price, Decimal::new(1250, 2));
        assert_eq!(product.name, before.name);
        assert_eq!(product.description, before.description);
        assert_eq!(product.brand, before.brand);
        assert_eq!(product.stock, before.stock);
        assert_eq!(product.created_at, before.created_at);
        assert_eq!(product.updated_at, later);
    }

    #[test]
    fn invalid_patch_leaves_product_untouched() {
        let mut product = widget();
        let before = product.clone();

        let err = product
            .apply_patch(ProductPatch::default().name(""), Utc::now())
            .unwrap_err();

        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(product, before);
    }

    #[test]
    fn search_matches_name_brand_or_id() {
        let product = widget();
        assert!(product.matches_search("widg", None));
        assert!(product.matches_search("acme", None));
        assert!(product.matches_search("zzz", Some(ProductId::new(1))));
        assert!(!product.matches_search("zzz", Some(ProductId::new(2))));
        assert!(!product.matches_search("zzz", None));
    }
}
