use thiserror::Error;

use stockbook_core::{DomainError, HistoryEntryId, ProductId};
use stockbook_inventory::{
    ExpectedStock, HistoryRecord, NewProduct, NewStockHistoryEntry, Product, ProductPatch,
    StockHistoryEntry,
};

/// Default number of history rows returned by history queries.
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;

/// Result type used by store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence error.
///
/// - **Validation**: the request was rejected before any write
/// - **ProductNotFound**: the targeted product id does not exist
/// - **Conflict**: a compare-and-set stock write found a different stock
/// - **Storage**: the backend failed (I/O, constraint violation, corrupt row)
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl StoreError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

impl From<DomainError> for StoreError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => StoreError::Validation(msg),
            DomainError::Conflict(msg) => StoreError::Conflict(msg),
        }
    }
}

/// Durable storage of products and their stock history.
///
/// ## Semantics
///
/// - Every call blocks until the storage round-trip has completed.
/// - Product ids and history ids are assigned by the store, increase
///   monotonically and are never reused.
/// - History is append-only: nothing here updates or deletes a history row,
///   and deleting a product leaves its history in place (weak reference).
/// - History queries join the product's current name; rows whose product no
///   longer exists are excluded from them.
///
/// Stock is not part of [`ProductPatch`]. The only way to change the stock of
/// an existing product is [`StoreTransaction::set_stock`], which callers pair
/// with a history insertion inside [`InventoryStore::transaction`].
pub trait InventoryStore: Send + Sync {
    /// Validate and insert a product, returning its new id.
    fn insert_product(&self, product: NewProduct) -> StoreResult<ProductId>;

    /// Merge the given fields and refresh `updated_at`.
    fn update_product_fields(&self, id: ProductId, patch: ProductPatch) -> StoreResult<Product>;

    /// Remove a product. Returns `false` when there was nothing to remove.
    fn delete_product(&self, id: ProductId) -> StoreResult<bool>;

    fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>>;

    /// All products, most recently updated first.
    fn list_products(&self) -> StoreResult<Vec<Product>>;

    /// Name/brand substring match (ASCII case-insensitive) or exact id when
    /// `term` parses as an integer. Ordered by name.
    fn search_products(&self, term: &str) -> StoreResult<Vec<Product>>;

    /// Products with `stock <= threshold`, lowest stock first.
    fn list_low_stock(&self, threshold: u32) -> StoreResult<Vec<Product>>;

    /// Products with `stock == 0`, ordered by name.
    fn list_out_of_stock(&self) -> StoreResult<Vec<Product>>;

    /// Append a history row outside of any stock change.
    fn insert_history(&self, entry: NewStockHistoryEntry) -> StoreResult<HistoryEntryId>;

    /// History of one product, newest first.
    fn list_history_for_product(
        &self,
        id: ProductId,
        limit: u32,
    ) -> StoreResult<Vec<HistoryRecord>>;

    /// History across all products, newest first.
    fn list_recent_history(&self, limit: u32) -> StoreResult<Vec<HistoryRecord>>;

    /// Run `work` as one atomic unit.
    ///
    /// Everything written through the transaction handle is committed when
    /// `work` returns `Ok` and discarded when it returns `Err`.
    fn transaction<T, F>(&self, work: F) -> StoreResult<T>
    where
        F: FnOnce(&mut dyn StoreTransaction) -> StoreResult<T>;
}

/// Operations available inside [`InventoryStore::transaction`].
pub trait StoreTransaction {
    fn get_product(&mut self, id: ProductId) -> StoreResult<Option<Product>>;

    /// Overwrite the stock of a product and refresh `updated_at`.
    ///
    /// Fails with `ProductNotFound` when the id is absent and with `Conflict`
    /// when the stored stock does not satisfy `expected`.
    fn set_stock(
        &mut self,
        id: ProductId,
        expected: ExpectedStock,
        new_stock: u32,
    ) -> StoreResult<Product>;

    fn insert_history(&mut self, entry: NewStockHistoryEntry) -> StoreResult<StockHistoryEntry>;
}

/// Parse a search term into the id it names, if any.
///
/// Backends that need a concrete value bind [`NO_MATCH_ID`] instead of `None`.
pub(crate) fn search_id(term: &str) -> Option<ProductId> {
    term.trim().parse::<i64>().ok().map(ProductId::new)
}

/// Sentinel id that never equals a stored id (ids start at 1).
pub(crate) const NO_MATCH_ID: i64 = -1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_keep_their_kind() {
        let err = StoreError::from(DomainError::validation("product name cannot be empty"));
        assert!(matches!(err, StoreError::Validation(ref msg) if msg == "product name cannot be empty"));

        let err = StoreError::from(DomainError::invalid_id("ProductId: invalid digit"));
        assert!(matches!(err, StoreError::Validation(_)));

        let err = StoreError::from(DomainError::conflict("stock changed"));
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn search_terms_parse_as_ids_only_when_numeric() {
        assert_eq!(search_id(" 42 "), Some(ProductId::new(42)));
        assert_eq!(search_id("abc"), None);
        assert_eq!(search_id("4x2"), None);
    }
}
