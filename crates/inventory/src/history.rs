use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockbook_core::{HistoryEntryId, ProductId};

/// Descriptive tag for a stock change.
///
/// Open string domain: the constants below are conventions, not an exhaustive
/// list. The tag never alters how an adjustment behaves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeType(String);

impl ChangeType {
    pub const MANUAL: &'static str = "manual";
    pub const RESTOCK: &'static str = "restock";
    pub const SALE: &'static str = "sale";

    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn manual() -> Self {
        Self::new(Self::MANUAL)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ChangeType {
    fn default() -> Self {
        Self::manual()
    }
}

impl core::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChangeType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ChangeType {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A history row ready to be appended (id and timestamp not yet assigned).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStockHistoryEntry {
    pub product_id: ProductId,
    pub old_stock: u32,
    pub new_stock: u32,
    pub change_type: ChangeType,
    pub reason: String,
}

/// An appended stock history row. Never mutated after insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockHistoryEntry {
    pub id: HistoryEntryId,
    /// Weak reference: the product may have been deleted since.
    pub product_id: ProductId,
    pub old_stock: u32,
    pub new_stock: u32,
    pub change_type: ChangeType,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl StockHistoryEntry {
    pub fn from_new(id: HistoryEntryId, new: NewStockHistoryEntry, now: DateTime<Utc>) -> Self {
        Self {
            id,
            product_id: new.product_id,
            old_stock: new.old_stock,
            new_stock: new.new_stock,
            change_type: new.change_type,
            reason: new.reason,
            created_at: now,
        }
    }

    /// Signed change in stock (`new_stock - old_stock`).
    pub fn variation(&self) -> i64 {
        i64::from(self.new_stock) - i64::from(self.old_stock)
    }
}

/// A history entry joined with the product's name at query time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(flatten)]
    pub entry: StockHistoryEntry,
    pub product_name: String,
}
