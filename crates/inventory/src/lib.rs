//! Inventory domain module.
//!
//! This crate contains the catalog and stock-history records and the rules
//! around them, implemented purely as deterministic domain logic (no IO, no
//! storage). Persistence and the stock ledger live in `stockbook-infra`.

pub mod history;
pub mod product;
pub mod stock;

pub use history::{ChangeType, HistoryRecord, NewStockHistoryEntry, StockHistoryEntry};
pub use product::{NewProduct, Product, ProductPatch};
pub use stock::{AdjustStock, ExpectedStock, InventorySummary, LowStockThreshold, StockLevel};
