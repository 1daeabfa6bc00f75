//! Infrastructure layer: persistence backends, the stock ledger and config.

pub mod config;
pub mod ledger;
pub mod store;

mod integration_tests;

pub use config::{ConfigError, StockbookConfig};
pub use ledger::{InventoryLedger, LedgerError, LedgerResult, LedgerSettings};
pub use store::{
    InMemoryInventoryStore, InventoryStore, SqliteInventoryStore, StoreError, StoreResult,
    StoreTransaction,
};
