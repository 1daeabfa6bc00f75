use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use stockbook_core::{HistoryEntryId, ProductId};
use stockbook_inventory::{
    ExpectedStock, HistoryRecord, NewProduct, NewStockHistoryEntry, Product, ProductPatch,
    StockHistoryEntry,
};

use super::r#trait::{
    InventoryStore, StoreError, StoreResult, StoreTransaction, search_id,
};

#[derive(Debug, Clone, Default)]
struct State {
    products: BTreeMap<ProductId, Product>,
    history: Vec<StockHistoryEntry>,
    last_product_id: i64,
    last_history_id: i64,
}

impl State {
    /// Appends with a timestamp no older than any stored entry, so insertion
    /// order and `created_at` order agree even if the clock steps back.
    fn insert_history(&mut self, entry: NewStockHistoryEntry, now: DateTime<Utc>) -> StockHistoryEntry {
        let now = self
            .history
            .iter()
            .map(|e| e.created_at)
            .max()
            .map_or(now, |latest| now.max(latest));
        self.last_history_id += 1;
        let stored =
            StockHistoryEntry::from_new(HistoryEntryId::new(self.last_history_id), entry, now);
        self.history.push(stored.clone());
        stored
    }

    fn set_stock(
        &mut self,
        id: ProductId,
        expected: ExpectedStock,
        new_stock: u32,
        now: DateTime<Utc>,
    ) -> StoreResult<Product> {
        let product = self
            .products
            .get_mut(&id)
            .ok_or(StoreError::ProductNotFound(id))?;
        expected.check(product.stock)?;

        product.stock = new_stock;
        product.updated_at = now;
        Ok(product.clone())
    }

    /// Newest-first history joined with current product names.
    fn history_records(&self, product_id: Option<ProductId>, limit: u32) -> Vec<HistoryRecord> {
        let mut records: Vec<HistoryRecord> = self
            .history
            .iter()
            .filter(|e| product_id.is_none_or(|id| e.product_id == id))
            .filter_map(|e| {
                self.products.get(&e.product_id).map(|p| HistoryRecord {
                    entry: e.clone(),
                    product_name: p.name.clone(),
                })
            })
            .collect();

        records.sort_by(|a, b| {
            b.entry
                .created_at
                .cmp(&a.entry.created_at)
                .then(b.entry.id.cmp(&a.entry.id))
        });
        records.truncate(limit as usize);
        records
    }

    fn products_where(&self, predicate: impl Fn(&Product) -> bool) -> Vec<Product> {
        self.products
            .values()
            .filter(|p| predicate(p))
            .cloned()
            .collect()
    }
}

/// In-memory inventory store.
///
/// Intended for tests/dev. Transactions run against a copy of the state that
/// replaces the live state only when the unit of work succeeds.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    state: RwLock<State>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| StoreError::storage("lock poisoned"))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| StoreError::storage("lock poisoned"))
    }
}

impl InventoryStore for InMemoryInventoryStore {
    fn insert_product(&self, product: NewProduct) -> StoreResult<ProductId> {
        product.validate()?;

        let mut state = self.write()?;
        state.last_product_id += 1;
        let id = ProductId::new(state.last_product_id);
        state
            .products
            .insert(id, Product::from_new(id, product, super::now()));

        tracing::debug!(product_id = %id, "product inserted");
        Ok(id)
    }

    fn update_product_fields(&self, id: ProductId, patch: ProductPatch) -> StoreResult<Product> {
        let mut state = self.write()?;
        let product = state
            .products
            .get_mut(&id)
            .ok_or(StoreError::ProductNotFound(id))?;
        product.apply_patch(patch, super::now())?;

        tracing::debug!(product_id = %id, "product fields updated");
        Ok(product.clone())
    }

    fn delete_product(&self, id: ProductId) -> StoreResult<bool> {
        let removed = self.write()?.products.remove(&id).is_some();
        tracing::debug!(product_id = %id, removed, "product delete");
        Ok(removed)
    }

    fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.read()?.products.get(&id).cloned())
    }

    fn list_products(&self) -> StoreResult<Vec<Product>> {
        let mut products = self.read()?.products_where(|_| true);
        products.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        Ok(products)
    }

    fn search_products(&self, term: &str) -> StoreResult<Vec<Product>> {
        let needle = term.to_ascii_lowercase();
        let id = search_id(term);

        let mut products = self
            .read()?
            .products_where(|p| p.matches_search(&needle, id));
        products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(products)
    }

    fn list_low_stock(&self, threshold: u32) -> StoreResult<Vec<Product>> {
        let mut products = self.read()?.products_where(|p| p.stock <= threshold);
        products.sort_by(|a, b| a.stock.cmp(&b.stock).then(a.id.cmp(&b.id)));
        Ok(products)
    }

    fn list_out_of_stock(&self) -> StoreResult<Vec<Product>> {
        let mut products = self.read()?.products_where(|p| p.stock == 0);
        products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(products)
    }

    fn insert_history(&self, entry: NewStockHistoryEntry) -> StoreResult<HistoryEntryId> {
        let stored = self.write()?.insert_history(entry, super::now());
        Ok(stored.id)
    }

    fn list_history_for_product(
        &self,
        id: ProductId,
        limit: u32,
    ) -> StoreResult<Vec<HistoryRecord>> {
        Ok(self.read()?.history_records(Some(id), limit))
    }

    fn list_recent_history(&self, limit: u32) -> StoreResult<Vec<HistoryRecord>> {
        Ok(self.read()?.history_records(None, limit))
    }

    fn transaction<T, F>(&self, work: F) -> StoreResult<T>
    where
        F: FnOnce(&mut dyn StoreTransaction) -> StoreResult<T>,
    {
        let mut live = self.write()?;
        let mut scratch = live.clone();

        let value = work(&mut InMemoryTransaction {
            state: &mut scratch,
        })?;

        *live = scratch;
        Ok(value)
    }
}

struct InMemoryTransaction<'a> {
    state: &'a mut State,
}

impl StoreTransaction for InMemoryTransaction<'_> {
    fn get_product(&mut self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.state.products.get(&id).cloned())
    }

    fn set_stock(
        &mut self,
        id: ProductId,
        expected: ExpectedStock,
        new_stock: u32,
    ) -> StoreResult<Product> {
        self.state.set_stock(id, expected, new_stock, super::now())
    }

    fn insert_history(&mut self, entry: NewStockHistoryEntry) -> StoreResult<StockHistoryEntry> {
        Ok(self.state.insert_history(entry, super::now()))
    }
}
