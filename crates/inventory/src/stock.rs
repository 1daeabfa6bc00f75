use serde::{Deserialize, Serialize};

use stockbook_core::{DomainError, DomainResult, ProductId};

use crate::history::ChangeType;

/// Boundary at or below which a product needs restocking attention.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LowStockThreshold(u32);

impl LowStockThreshold {
    pub const DEFAULT: u32 = 10;

    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl Default for LowStockThreshold {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

/// View-time classification of a stock quantity. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    OutOfStock,
    /// `0 < stock <= threshold` (inclusive on the low side).
    Low,
    InStock,
}

impl StockLevel {
    pub fn classify(stock: u32, threshold: LowStockThreshold) -> Self {
        if stock == 0 {
            StockLevel::OutOfStock
        } else if stock <= threshold.get() {
            StockLevel::Low
        } else {
            StockLevel::InStock
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockLevel::OutOfStock => "out_of_stock",
            StockLevel::Low => "low",
            StockLevel::InStock => "in_stock",
        }
    }
}

/// Stock a product must still have for an overwrite to go through.
///
/// Adapted from optimistic version checks: a stock write carrying
/// `ExpectedStock::new(n)` only succeeds while the stored stock is still `n`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ExpectedStock(u32);

impl ExpectedStock {
    pub const fn new(stock: u32) -> Self {
        Self(stock)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    pub fn matches(self, actual: u32) -> bool {
        self.0 == actual
    }

    pub fn check(self, actual: u32) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "stock changed concurrently (expected: {}, actual: {actual})",
                self.0
            )))
        }
    }
}

/// Command: set a product's stock to an absolute value and record why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustStock {
    pub product_id: ProductId,
    pub new_stock: u32,
    #[serde(default)]
    pub change_type: ChangeType,
    #[serde(default)]
    pub reason: String,
}

impl AdjustStock {
    /// A `manual` adjustment with an empty reason.
    pub fn new(product_id: ProductId, new_stock: u32) -> Self {
        Self {
            product_id,
            new_stock,
            change_type: ChangeType::manual(),
            reason: String::new(),
        }
    }

    pub fn with_change_type(mut self, change_type: impl Into<ChangeType>) -> Self {
        self.change_type = change_type.into();
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }
}

/// Catalog-wide stock counters shown on the main menu.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySummary {
    pub total: usize,
    pub low_stock: usize,
    pub out_of_stock: usize,
}
