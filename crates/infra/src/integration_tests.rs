//! Integration tests for the stock ledger over both store backends.
//!
//! Tests: Ledger → InventoryStore (in-memory and SQLite) → queries
//!
//! Verifies:
//! - Adjustments update stock and append exactly one matching history entry
//! - Missing products are rejected without writing anything
//! - Search, low-stock and out-of-stock queries agree across backends
//! - Catalogue edits and deletes leave stock history intact

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use stockbook_core::ProductId;
    use stockbook_inventory::{AdjustStock, NewProduct, ProductPatch, StockLevel};

    use crate::ledger::{InventoryLedger, LedgerError};
    use crate::store::{InMemoryInventoryStore, InventoryStore, SqliteInventoryStore};

    fn in_memory() -> InventoryLedger<InMemoryInventoryStore> {
        InventoryLedger::new(InMemoryInventoryStore::new())
    }

    fn sqlite() -> InventoryLedger<SqliteInventoryStore> {
        InventoryLedger::new(SqliteInventoryStore::open_in_memory().unwrap())
    }

    /// Runs each scenario once per backend.
    macro_rules! on_both_backends {
        ($($scenario:ident),* $(,)?) => {
            mod in_memory_backend {
                $(
                    #[test]
                    fn $scenario() {
                        super::$scenario(super::in_memory());
                    }
                )*
            }

            mod sqlite_backend {
                $(
                    #[test]
                    fn $scenario() {
                        super::$scenario(super::sqlite());
                    }
                )*
            }
        };
    }

    on_both_backends!(
        restock_records_history_and_updates_stock,
        adjusting_unknown_product_fails_without_history,
        numeric_search_matches_by_id,
        low_and_out_of_stock_reports,
        search_is_case_insensitive_and_idempotent,
        insert_get_round_trip,
        partial_edit_keeps_other_fields,
        deleting_product_keeps_history_out_of_views,
        recent_history_spans_products_newest_first,
        stock_boundaries_classify,
    );

    fn widget() -> NewProduct {
        NewProduct::new("Widget", Decimal::new(999, 2))
            .with_stock(5)
            .with_brand("Acme")
    }

    fn restock_records_history_and_updates_stock<S: InventoryStore>(ledger: InventoryLedger<S>) {
        let product = ledger.add_product(widget()).unwrap();
        assert_eq!(product.id, ProductId::new(1));

        ledger
            .adjust_stock(
                AdjustStock::new(product.id, 12)
                    .with_change_type("restock")
                    .with_reason("supplier delivery"),
            )
            .unwrap();

        let history = ledger.history_for_product_default(product.id).unwrap();
        assert_eq!(history.len(), 1);
        let record = &history[0];
        assert_eq!(record.entry.old_stock, 5);
        assert_eq!(record.entry.new_stock, 12);
        assert_eq!(record.entry.change_type.as_str(), "restock");
        assert_eq!(record.entry.reason, "supplier delivery");
        assert_eq!(record.product_name, "Widget");

        let stored = ledger.product(product.id).unwrap();
        assert_eq!(stored.stock, 12);
        assert!(stored.updated_at >= product.updated_at);
    }

    fn adjusting_unknown_product_fails_without_history<S: InventoryStore>(
        ledger: InventoryLedger<S>,
    ) {
        ledger.add_product(widget()).unwrap();

        let err = ledger
            .adjust_stock(AdjustStock::new(ProductId::new(999), 5))
            .unwrap_err();

        assert!(matches!(err, LedgerError::NotFound(id) if id == ProductId::new(999)));
        assert!(ledger.recent_history(100).unwrap().is_empty());
    }

    fn numeric_search_matches_by_id<S: InventoryStore>(ledger: InventoryLedger<S>) {
        for _ in 0..42 {
            ledger
                .add_product(NewProduct::new("Gadget", Decimal::ONE).with_brand("Acme"))
                .unwrap();
        }

        let found = ledger.search_products("42").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, ProductId::new(42));

        assert!(ledger.search_products("abc").unwrap().is_empty());
    }

    fn low_and_out_of_stock_reports<S: InventoryStore>(ledger: InventoryLedger<S>) {
        for (name, stock) in [("Eleven", 11), ("Ten", 10), ("Zero", 0), ("Five", 5)] {
            ledger
                .add_product(NewProduct::new(name, Decimal::ONE).with_stock(stock))
                .unwrap();
        }

        let low: Vec<u32> = ledger
            .low_stock(10)
            .unwrap()
            .iter()
            .map(|p| p.stock)
            .collect();
        assert_eq!(low, vec![0, 5, 10]);
        assert_eq!(ledger.low_stock_default().unwrap().len(), 3);

        let out = ledger.out_of_stock().unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "Zero");
    }

    fn search_is_case_insensitive_and_idempotent<S: InventoryStore>(ledger: InventoryLedger<S>) {
        ledger.add_product(widget()).unwrap();
        ledger
            .add_product(NewProduct::new("Bolt", Decimal::ONE).with_brand("ACME Hardware"))
            .unwrap();
        ledger
            .add_product(NewProduct::new("Nut", Decimal::ONE).with_brand("Other"))
            .unwrap();

        let first = ledger.search_products("acme").unwrap();
        let names: Vec<&str> = first.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Bolt", "Widget"]);

        let second = ledger.search_products("acme").unwrap();
        assert_eq!(first, second);

        assert_eq!(ledger.search_products("WIDG").unwrap().len(), 1);
    }

    fn insert_get_round_trip<S: InventoryStore>(ledger: InventoryLedger<S>) {
        let product = ledger
            .add_product(widget().with_description("Left-handed"))
            .unwrap();
        let fetched = ledger.product(product.id).unwrap();

        assert_eq!(fetched, product);
        assert_eq!(fetched.price, Decimal::new(999, 2));
        assert_eq!(fetched.description, "Left-handed");
    }

    fn partial_edit_keeps_other_fields<S: InventoryStore>(ledger: InventoryLedger<S>) {
        let product = ledger.add_product(widget()).unwrap();

        let edited = ledger
            .edit_product(product.id, ProductPatch::default().price(Decimal::new(1250, 2)))
            .unwrap();

        assert_eq!(edited.price, Decimal::new(1250, 2));
        assert_eq!(edited.name, product.name);
        assert_eq!(edited.brand, product.brand);
        assert_eq!(edited.stock, product.stock);
        assert_eq!(edited.created_at, product.created_at);

        let err = ledger
            .edit_product(product.id, ProductPatch::default().name("  "))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert_eq!(ledger.product(product.id).unwrap().name, "Widget");
    }

    fn deleting_product_keeps_history_out_of_views<S: InventoryStore>(ledger: InventoryLedger<S>) {
        let doomed = ledger.add_product(widget()).unwrap();
        let kept = ledger
            .add_product(NewProduct::new("Bolt", Decimal::ONE).with_stock(1))
            .unwrap();
        ledger.adjust_stock(AdjustStock::new(doomed.id, 1)).unwrap();
        ledger.adjust_stock(AdjustStock::new(kept.id, 2)).unwrap();

        assert!(ledger.delete_product(doomed.id).unwrap());
        assert!(!ledger.delete_product(doomed.id).unwrap());

        assert!(ledger.history_for_product_default(doomed.id).unwrap().is_empty());
        let recent = ledger.recent_history(10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].product_name, "Bolt");

        let next = ledger.add_product(widget()).unwrap();
        assert!(next.id > kept.id);
    }

    fn recent_history_spans_products_newest_first<S: InventoryStore>(ledger: InventoryLedger<S>) {
        let a = ledger.add_product(widget()).unwrap();
        let b = ledger
            .add_product(NewProduct::new("Bolt", Decimal::ONE))
            .unwrap();

        ledger.adjust_stock(AdjustStock::new(a.id, 6)).unwrap();
        ledger.adjust_stock(AdjustStock::new(b.id, 3)).unwrap();
        ledger.adjust_stock(AdjustStock::new(a.id, 2)).unwrap();

        let recent = ledger.recent_history(2).unwrap();
        let summary: Vec<(ProductId, u32)> = recent
            .iter()
            .map(|r| (r.entry.product_id, r.entry.new_stock))
            .collect();
        assert_eq!(summary, vec![(a.id, 2), (b.id, 3)]);
        assert_eq!(recent[0].entry.variation(), -4);
    }

    fn stock_boundaries_classify<S: InventoryStore>(ledger: InventoryLedger<S>) {
        let product = ledger.add_product(widget()).unwrap();

        ledger.adjust_stock(AdjustStock::new(product.id, 0)).unwrap();
        let empty = ledger.product(product.id).unwrap();
        assert_eq!(ledger.classify(&empty), StockLevel::OutOfStock);
        assert_eq!(ledger.out_of_stock().unwrap().len(), 1);

        ledger.adjust_stock(AdjustStock::new(product.id, 10)).unwrap();
        let at_threshold = ledger.product(product.id).unwrap();
        assert_eq!(ledger.classify(&at_threshold), StockLevel::Low);
        assert_eq!(ledger.low_stock_default().unwrap().len(), 1);
        assert!(ledger.out_of_stock().unwrap().is_empty());

        ledger.adjust_stock(AdjustStock::new(product.id, 11)).unwrap();
        assert!(ledger.low_stock_default().unwrap().is_empty());
    }
}
