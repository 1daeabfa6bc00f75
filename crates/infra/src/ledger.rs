//! Inventory ledger: the stock adjustment pipeline and catalogue queries.
//!
//! The ledger is the only component that changes stock. Each adjustment runs
//! as one store transaction:
//!
//! ```text
//! AdjustStock
//!   ↓
//! 1. Load the product (NotFound → nothing written)
//!   ↓
//! 2. Capture old_stock
//!   ↓
//! 3. Compare-and-set stock (expect old_stock → new_stock)
//!   ↓
//! 4. Append history (product_id, old_stock, new_stock, change_type, reason)
//!   ↓
//! commit (3 and 4 together) or rollback (neither)
//! ```
//!
//! Everything else is delegation to the store with the configured defaults.

use thiserror::Error;

use stockbook_core::{DomainError, ProductId};
use stockbook_inventory::{
    AdjustStock, ExpectedStock, HistoryRecord, InventorySummary, LowStockThreshold, NewProduct,
    NewStockHistoryEntry, Product, ProductPatch, StockHistoryEntry, StockLevel,
};

use crate::store::{DEFAULT_HISTORY_LIMIT, InventoryStore, StoreError};

/// Default number of rows shown by the recent-history view.
pub const DEFAULT_RECENT_HISTORY_LIMIT: u32 = 20;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// Input rejected before any write.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("product {0} not found")]
    NotFound(ProductId),

    /// Stock changed between read and write; nothing was written.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

impl From<StoreError> for LedgerError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Validation(msg) => LedgerError::Validation(msg),
            StoreError::ProductNotFound(id) => LedgerError::NotFound(id),
            StoreError::Conflict(msg) => LedgerError::Conflict(msg),
            StoreError::Storage(msg) => LedgerError::Storage(msg),
        }
    }
}

impl From<DomainError> for LedgerError {
    fn from(value: DomainError) -> Self {
        StoreError::from(value).into()
    }
}

/// Tunables the ledger applies when callers rely on defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerSettings {
    pub low_stock_threshold: LowStockThreshold,
    pub history_limit: u32,
    pub recent_history_limit: u32,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            low_stock_threshold: LowStockThreshold::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            recent_history_limit: DEFAULT_RECENT_HISTORY_LIMIT,
        }
    }
}

/// Stock ledger over an owned store.
///
/// The store is injected by the caller and released with [`InventoryLedger::into_store`].
#[derive(Debug)]
pub struct InventoryLedger<S> {
    store: S,
    settings: LedgerSettings,
}

impl<S> InventoryLedger<S> {
    pub fn new(store: S) -> Self {
        Self::with_settings(store, LedgerSettings::default())
    }

    pub fn with_settings(store: S, settings: LedgerSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> LedgerSettings {
        self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

impl<S> InventoryLedger<S>
where
    S: InventoryStore,
{
    /// Set a product's stock to `new_stock` and record the change.
    ///
    /// Any value is accepted (increase, decrease or unchanged); the change type
    /// is descriptive only. Returns the appended history entry.
    pub fn adjust_stock(&self, command: AdjustStock) -> LedgerResult<StockHistoryEntry> {
        let AdjustStock {
            product_id,
            new_stock,
            change_type,
            reason,
        } = command;

        let entry = self.store.transaction(|tx| {
            let product = tx
                .get_product(product_id)?
                .ok_or(StoreError::ProductNotFound(product_id))?;
            let old_stock = product.stock;

            // Must go through the transaction handle, never `self.store`.
            tx.set_stock(product_id, ExpectedStock::new(old_stock), new_stock)?;
            tx.insert_history(NewStockHistoryEntry {
                product_id,
                old_stock,
                new_stock,
                change_type,
                reason,
            })
        });

        match entry {
            Ok(entry) => {
                tracing::info!(
                    product_id = %product_id,
                    old_stock = entry.old_stock,
                    new_stock = entry.new_stock,
                    change_type = %entry.change_type,
                    "stock adjusted"
                );
                Ok(entry)
            }
            Err(err) => {
                tracing::debug!(product_id = %product_id, error = %err, "stock adjustment rejected");
                Err(err.into())
            }
        }
    }

    pub fn search_products(&self, term: &str) -> LedgerResult<Vec<Product>> {
        Ok(self.store.search_products(term)?)
    }

    /// Products at or below `threshold`, lowest stock first.
    pub fn low_stock(&self, threshold: u32) -> LedgerResult<Vec<Product>> {
        Ok(self.store.list_low_stock(threshold)?)
    }

    pub fn low_stock_default(&self) -> LedgerResult<Vec<Product>> {
        self.low_stock(self.settings.low_stock_threshold.get())
    }

    pub fn out_of_stock(&self) -> LedgerResult<Vec<Product>> {
        Ok(self.store.list_out_of_stock()?)
    }

    pub fn history_for_product(&self, id: ProductId, limit: u32) -> LedgerResult<Vec<HistoryRecord>> {
        Ok(self.store.list_history_for_product(id, limit)?)
    }

    pub fn history_for_product_default(&self, id: ProductId) -> LedgerResult<Vec<HistoryRecord>> {
        self.history_for_product(id, self.settings.history_limit)
    }

    pub fn recent_history(&self, limit: u32) -> LedgerResult<Vec<HistoryRecord>> {
        Ok(self.store.list_recent_history(limit)?)
    }

    pub fn recent_history_default(&self) -> LedgerResult<Vec<HistoryRecord>> {
        self.recent_history(self.settings.recent_history_limit)
    }

    // Catalogue

    pub fn add_product(&self, product: NewProduct) -> LedgerResult<Product> {
        let id = self.store.insert_product(product)?;
        tracing::info!(product_id = %id, "product added");
        self.product(id)
    }

    /// Apply a partial edit. An empty patch returns the product unchanged.
    pub fn edit_product(&self, id: ProductId, patch: ProductPatch) -> LedgerResult<Product> {
        if patch.is_empty() {
            return self.product(id);
        }
        let product = self.store.update_product_fields(id, patch)?;
        tracing::info!(product_id = %id, "product edited");
        Ok(product)
    }

    /// Returns `false` when the product did not exist. History rows are kept.
    pub fn delete_product(&self, id: ProductId) -> LedgerResult<bool> {
        let removed = self.store.delete_product(id)?;
        if removed {
            tracing::info!(product_id = %id, "product deleted");
        }
        Ok(removed)
    }

    pub fn product(&self, id: ProductId) -> LedgerResult<Product> {
        self.store
            .get_product(id)?
            .ok_or(LedgerError::NotFound(id))
    }

    pub fn list_products(&self) -> LedgerResult<Vec<Product>> {
        Ok(self.store.list_products()?)
    }

    /// Counters for the main menu. Out-of-stock products also count as low.
    pub fn summary(&self) -> LedgerResult<InventorySummary> {
        Ok(InventorySummary {
            total: self.store.list_products()?.len(),
            low_stock: self.low_stock_default()?.len(),
            out_of_stock: self.store.list_out_of_stock()?.len(),
        })
    }

    pub fn classify(&self, product: &Product) -> StockLevel {
        product.stock_level(self.settings.low_stock_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryInventoryStore, StoreResult, StoreTransaction};
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use stockbook_core::HistoryEntryId;

    fn ledger() -> InventoryLedger<InMemoryInventoryStore> {
        InventoryLedger::new(InMemoryInventoryStore::new())
    }

    fn widget(stock: u32) -> NewProduct {
        NewProduct::new("Widget", Decimal::new(999, 2))
            .with_stock(stock)
            .with_brand("Acme")
    }

    /// Store whose transactions fail on history insertion, after the stock write.
    struct FailingHistoryStore(InMemoryInventoryStore);

    struct FailOnHistory<'a> {
        inner: &'a mut dyn StoreTransaction,
    }

    impl StoreTransaction for FailOnHistory<'_> {
        fn get_product(&mut self, id: ProductId) -> StoreResult<Option<Product>> {
            self.inner.get_product(id)
        }

        fn set_stock(
            &mut self,
            id: ProductId,
            expected: ExpectedStock,
            new_stock: u32,
        ) -> StoreResult<Product> {
            self.inner.set_stock(id, expected, new_stock)
        }

        fn insert_history(&mut self, _entry: NewStockHistoryEntry) -> StoreResult<StockHistoryEntry> {
            Err(StoreError::storage("disk full"))
        }
    }

    impl InventoryStore for FailingHistoryStore {
        fn insert_product(&self, product: NewProduct) -> StoreResult<ProductId> {
            self.0.insert_product(product)
        }

        fn update_product_fields(&self, id: ProductId, patch: ProductPatch) -> StoreResult<Product> {
            self.0.update_product_fields(id, patch)
        }

        fn delete_product(&self, id: ProductId) -> StoreResult<bool> {
            self.0.delete_product(id)
        }

        fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
            self.0.get_product(id)
        }

        fn list_products(&self) -> StoreResult<Vec<Product>> {
            self.0.list_products()
        }

        fn search_products(&self, term: &str) -> StoreResult<Vec<Product>> {
            self.0.search_products(term)
        }

        fn list_low_stock(&self, threshold: u32) -> StoreResult<Vec<Product>> {
            self.0.list_low_stock(threshold)
        }

        fn list_out_of_stock(&self) -> StoreResult<Vec<Product>> {
            self.0.list_out_of_stock()
        }

        fn insert_history(&self, entry: NewStockHistoryEntry) -> StoreResult<HistoryEntryId> {
            self.0.insert_history(entry)
        }

        fn list_history_for_product(
            &self,
            id: ProductId,
            limit: u32,
        ) -> StoreResult<Vec<HistoryRecord>> {
            self.0.list_history_for_product(id, limit)
        }

        fn list_recent_history(&self, limit: u32) -> StoreResult<Vec<HistoryRecord>> {
            self.0.list_recent_history(limit)
        }

        fn transaction<T, F>(&self, work: F) -> StoreResult<T>
        where
            F: FnOnce(&mut dyn StoreTransaction) -> StoreResult<T>,
        {
            self.0
                .transaction(|tx| work(&mut FailOnHistory { inner: tx }))
        }
    }

    #[test]
    fn adjustment_records_old_and_new_stock() {
        let ledger = ledger();
        let product = ledger.add_product(widget(5)).unwrap();

        let entry = ledger
            .adjust_stock(
                AdjustStock::new(product.id, 12)
                    .with_change_type("restock")
                    .with_reason("supplier delivery"),
            )
            .unwrap();

        assert_eq!((entry.old_stock, entry.new_stock), (5, 12));
        assert_eq!(entry.change_type.as_str(), "restock");
        assert_eq!(entry.reason, "supplier delivery");
        assert_eq!(ledger.product(product.id).unwrap().stock, 12);
    }

    #[test]
    fn unchanged_stock_still_records_history() {
        let ledger = ledger();
        let product = ledger.add_product(widget(7)).unwrap();

        let entry = ledger.adjust_stock(AdjustStock::new(product.id, 7)).unwrap();

        assert_eq!(entry.variation(), 0);
        assert_eq!(entry.change_type.as_str(), "manual");
        assert_eq!(ledger.history_for_product_default(product.id).unwrap().len(), 1);
    }

    #[test]
    fn adjusting_missing_product_writes_nothing() {
        let ledger = ledger();
        let err = ledger
            .adjust_stock(AdjustStock::new(ProductId::new(999), 5))
            .unwrap_err();

        assert!(matches!(err, LedgerError::NotFound(id) if id == ProductId::new(999)));
        assert!(ledger.recent_history(100).unwrap().is_empty());
    }

    #[test]
    fn history_failure_rolls_back_stock_update() {
        let ledger = InventoryLedger::new(FailingHistoryStore(InMemoryInventoryStore::new()));
        let product = ledger.add_product(widget(5)).unwrap();

        let err = ledger
            .adjust_stock(AdjustStock::new(product.id, 12))
            .unwrap_err();

        assert!(matches!(err, LedgerError::Storage(ref msg) if msg == "disk full"));
        let stored = ledger.product(product.id).unwrap();
        assert_eq!(stored.stock, 5);
        assert_eq!(stored.updated_at, product.updated_at);
        assert!(ledger.history_for_product_default(product.id).unwrap().is_empty());
    }

    #[test]
    fn summary_counts_out_of_stock_as_low() {
        let ledger = ledger();
        for stock in [0, 5, 10, 11] {
            ledger.add_product(widget(stock)).unwrap();
        }

        let summary = ledger.summary().unwrap();
        assert_eq!(
            summary,
            InventorySummary {
                total: 4,
                low_stock: 3,
                out_of_stock: 1,
            }
        );
    }

    #[test]
    fn empty_patch_returns_product_unchanged() {
        let ledger = ledger();
        let product = ledger.add_product(widget(1)).unwrap();

        let same = ledger.edit_product(product.id, ProductPatch::default()).unwrap();
        assert_eq!(same, product);

        let err = ledger
            .edit_product(ProductId::new(42), ProductPatch::default())
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }

    #[test]
    fn classify_uses_configured_threshold() {
        let ledger = InventoryLedger::with_settings(
            InMemoryInventoryStore::new(),
            LedgerSettings {
                low_stock_threshold: LowStockThreshold::new(3),
                ..LedgerSettings::default()
            },
        );
        let product = ledger.add_product(widget(4)).unwrap();
        assert_eq!(ledger.classify(&product), StockLevel::InStock);

        ledger.adjust_stock(AdjustStock::new(product.id, 3)).unwrap();
        let product = ledger.product(product.id).unwrap();
        assert_eq!(ledger.classify(&product), StockLevel::Low);
    }

    proptest! {
        /// Property: history chains and the product's stock equals the
        /// newest entry's `new_stock`, whatever the adjustment sequence.
        #[test]
        fn history_chains_to_current_stock(
            initial in 0u32..500,
            targets in prop::collection::vec(0u32..500, 1..20),
        ) {
            let ledger = ledger();
            let product = ledger.add_product(widget(initial)).unwrap();

            for target in &targets {
                ledger.adjust_stock(AdjustStock::new(product.id, *target)).unwrap();
            }

            // Newest first; walk oldest first.
            let mut history = ledger.history_for_product(product.id, 100).unwrap();
            history.reverse();
            prop_assert_eq!(history.len(), targets.len());

            let mut expected_old = initial;
            for (record, target) in history.iter().zip(&targets) {
                prop_assert_eq!(record.entry.old_stock, expected_old);
                prop_assert_eq!(record.entry.new_stock, *target);
                expected_old = record.entry.new_stock;
            }

            let stock = ledger.product(product.id).unwrap().stock;
            prop_assert_eq!(stock, *targets.last().unwrap());
        }
    }
}
