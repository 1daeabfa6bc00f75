//! SQLite-backed inventory store.
//!
//! The store exposes the synchronous [`InventoryStore`] API on top of `sqlx`.
//! It owns a current-thread tokio runtime and blocks on each query, so callers
//! never see a suspension point.
//!
//! ## Storage layout
//!
//! - ids are `INTEGER PRIMARY KEY AUTOINCREMENT`, so they are never reused
//! - timestamps are fixed-width RFC 3339 UTC text with microseconds, which
//!   makes text order equal time order
//! - prices are decimal text (no float rounding)
//! - `stock_history.product_id` has no foreign key: history outlives products

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePoolOptions, SqliteRow};
use sqlx::{Executor, Row, Sqlite, SqlitePool, Transaction};
use tokio::runtime::Runtime;

use stockbook_core::{HistoryEntryId, ProductId};
use stockbook_inventory::{
    ChangeType, ExpectedStock, HistoryRecord, NewProduct, NewStockHistoryEntry, Product,
    ProductPatch, StockHistoryEntry,
};

use super::r#trait::{
    InventoryStore, NO_MATCH_ID, StoreError, StoreResult, StoreTransaction, search_id,
};

impl From<sqlx::Error> for StoreError {
    fn from(value: sqlx::Error) -> Self {
        StoreError::Storage(value.to_string())
    }
}

const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        name        TEXT    NOT NULL,
        description TEXT    NOT NULL DEFAULT '',
        price       TEXT    NOT NULL DEFAULT '0',
        stock       INTEGER NOT NULL DEFAULT 0 CHECK (stock >= 0),
        brand       TEXT    NOT NULL DEFAULT '',
        created_at  TEXT    NOT NULL,
        updated_at  TEXT    NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS stock_history (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        product_id  INTEGER NOT NULL,
        old_stock   INTEGER NOT NULL CHECK (old_stock >= 0),
        new_stock   INTEGER NOT NULL CHECK (new_stock >= 0),
        change_type TEXT    NOT NULL,
        reason      TEXT    NOT NULL DEFAULT '',
        created_at  TEXT    NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_stock_history_product
        ON stock_history (product_id, created_at)
    "#,
];

/// SQLite-backed store for products and stock history.
pub struct SqliteInventoryStore {
    // Declared first so the pool is dropped while the runtime is still alive.
    pool: SqlitePool,
    runtime: Runtime,
}

impl SqliteInventoryStore {
    /// Open (creating if missing) the database at `url` and bootstrap the schema.
    ///
    /// In-memory databases are pinned to a single connection that is never
    /// recycled, otherwise every new connection would see an empty database.
    pub fn open(url: &str, max_connections: u32) -> StoreResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StoreError::storage(format!("failed to build tokio runtime: {e}")))?;

        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = runtime.block_on(async {
            let pool = pool_options.connect_with(options).await?;
            for statement in SCHEMA {
                sqlx::query(statement).execute(&pool).await?;
            }
            Ok::<_, StoreError>(pool)
        })?;

        tracing::info!(url, in_memory, "sqlite inventory store opened");
        Ok(Self { pool, runtime })
    }

    /// Private in-memory database (tests/dev).
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::open("sqlite::memory:", 1)
    }

    /// Close the pool, waiting for checked-out connections to be returned.
    pub fn close(self) {
        let Self { pool, runtime } = self;
        runtime.block_on(pool.close());
        tracing::info!("sqlite inventory store closed");
    }
}

impl InventoryStore for SqliteInventoryStore {
    fn insert_product(&self, product: NewProduct) -> StoreResult<ProductId> {
        product.validate()?;
        let now = encode_timestamp(super::now());

        let result = self.runtime.block_on(
            sqlx::query(
                r#"
                INSERT INTO products (
                    name,
                    description,
                    price,
                    stock,
                    brand,
                    created_at,
                    updated_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&product.name)
            .bind(&product.description)
            .bind(product.price.to_string())
            .bind(i64::from(product.stock))
            .bind(&product.brand)
            .bind(&now)
            .bind(&now)
            .execute(&self.pool),
        )?;

        let id = ProductId::new(result.last_insert_rowid());
        tracing::debug!(product_id = %id, "product inserted");
        Ok(id)
    }

    fn update_product_fields(&self, id: ProductId, patch: ProductPatch) -> StoreResult<Product> {
        patch.validate()?;
        let now = encode_timestamp(super::now());

        self.runtime.block_on(async {
            let mut tx = self.pool.begin().await?;

            let result = sqlx::query(
                r#"
                UPDATE products
                SET name        = COALESCE(?1, name),
                    description = COALESCE(?2, description),
                    price       = COALESCE(?3, price),
                    brand       = COALESCE(?4, brand),
                    updated_at  = ?5
                WHERE id = ?6
                "#,
            )
            .bind(patch.name.as_deref())
            .bind(patch.description.as_deref())
            .bind(patch.price.map(|p| p.to_string()))
            .bind(patch.brand.as_deref())
            .bind(&now)
            .bind(id.get())
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(StoreError::ProductNotFound(id));
            }

            let product = fetch_product(&mut *tx, id)
                .await?
                .ok_or(StoreError::ProductNotFound(id))?;
            tx.commit().await?;

            tracing::debug!(product_id = %id, "product fields updated");
            Ok::<_, StoreError>(product)
        })
    }

    fn delete_product(&self, id: ProductId) -> StoreResult<bool> {
        let result = self.runtime.block_on(
            sqlx::query("DELETE FROM products WHERE id = ?1")
                .bind(id.get())
                .execute(&self.pool),
        )?;

        let removed = result.rows_affected() > 0;
        tracing::debug!(product_id = %id, removed, "product delete");
        Ok(removed)
    }

    fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        self.runtime.block_on(fetch_product(&self.pool, id))
    }

    fn list_products(&self) -> StoreResult<Vec<Product>> {
        let rows = self.runtime.block_on(
            sqlx::query(
                r#"
                SELECT id, name, description, price, stock, brand, created_at, updated_at
                FROM products
                ORDER BY updated_at DESC, id DESC
                "#,
            )
            .fetch_all(&self.pool),
        )?;

        rows.iter().map(product_from_row).collect()
    }

    fn search_products(&self, term: &str) -> StoreResult<Vec<Product>> {
        let needle = term.to_ascii_lowercase();
        let id = search_id(term).map(|id| id.get()).unwrap_or(NO_MATCH_ID);

        let rows = self.runtime.block_on(
            sqlx::query(
                r#"
                SELECT id, name, description, price, stock, brand, created_at, updated_at
                FROM products
                WHERE instr(lower(name), ?1) > 0
                   OR instr(lower(brand), ?2) > 0
                   OR id = ?3
                ORDER BY name ASC, id ASC
                "#,
            )
            .bind(&needle)
            .bind(&needle)
            .bind(id)
            .fetch_all(&self.pool),
        )?;

        rows.iter().map(product_from_row).collect()
    }

    fn list_low_stock(&self, threshold: u32) -> StoreResult<Vec<Product>> {
        let rows = self.runtime.block_on(
            sqlx::query(
                r#"
                SELECT id, name, description, price, stock, brand, created_at, updated_at
                FROM products
                WHERE stock <= ?1
                ORDER BY stock ASC, id ASC
                "#,
            )
            .bind(i64::from(threshold))
            .fetch_all(&self.pool),
        )?;

        rows.iter().map(product_from_row).collect()
    }

    fn list_out_of_stock(&self) -> StoreResult<Vec<Product>> {
        let rows = self.runtime.block_on(
            sqlx::query(
                r#"
                SELECT id, name, description, price, stock, brand, created_at, updated_at
                FROM products
                WHERE stock = 0
                ORDER BY name ASC, id ASC
                "#,
            )
            .fetch_all(&self.pool),
        )?;

        rows.iter().map(product_from_row).collect()
    }

    fn insert_history(&self, entry: NewStockHistoryEntry) -> StoreResult<HistoryEntryId> {
        let stored = self.runtime.block_on(async {
            let mut tx = self.pool.begin().await?;
            let stored = append_history(&mut tx, entry, super::now()).await?;
            tx.commit().await?;
            Ok::<_, StoreError>(stored)
        })?;
        Ok(stored.id)
    }

    fn list_history_for_product(
        &self,
        id: ProductId,
        limit: u32,
    ) -> StoreResult<Vec<HistoryRecord>> {
        let rows = self.runtime.block_on(
            sqlx::query(
                r#"
                SELECT
                    h.id          AS id,
                    h.product_id  AS product_id,
                    h.old_stock   AS old_stock,
                    h.new_stock   AS new_stock,
                    h.change_type AS change_type,
                    h.reason      AS reason,
                    h.created_at  AS created_at,
                    p.name        AS product_name
                FROM stock_history h
                JOIN products p ON p.id = h.product_id
                WHERE h.product_id = ?1
                ORDER BY h.created_at DESC, h.id DESC
                LIMIT ?2
                "#,
            )
            .bind(id.get())
            .bind(i64::from(limit))
            .fetch_all(&self.pool),
        )?;

        rows.iter().map(record_from_row).collect()
    }

    fn list_recent_history(&self, limit: u32) -> StoreResult<Vec<HistoryRecord>> {
        let rows = self.runtime.block_on(
            sqlx::query(
                r#"
                SELECT
                    h.id          AS id,
                    h.product_id  AS product_id,
                    h.old_stock   AS old_stock,
                    h.new_stock   AS new_stock,
                    h.change_type AS change_type,
                    h.reason      AS reason,
                    h.created_at  AS created_at,
                    p.name        AS product_name
                FROM stock_history h
                JOIN products p ON p.id = h.product_id
                ORDER BY h.created_at DESC, h.id DESC
                LIMIT ?1
                "#,
            )
            .bind(i64::from(limit))
            .fetch_all(&self.pool),
        )?;

        rows.iter().map(record_from_row).collect()
    }

    fn transaction<T, F>(&self, work: F) -> StoreResult<T>
    where
        F: FnOnce(&mut dyn StoreTransaction) -> StoreResult<T>,
    {
        let tx = self.runtime.block_on(self.pool.begin())?;
        let mut scope = SqliteTransaction {
            runtime: &self.runtime,
            tx,
        };

        match work(&mut scope) {
            Ok(value) => {
                self.runtime.block_on(scope.tx.commit())?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.runtime.block_on(scope.tx.rollback()) {
                    tracing::warn!(error = %rollback_err, "transaction rollback failed");
                }
                Err(err)
            }
        }
    }
}

/// Transaction handle; dropped without commit means rollback.
struct SqliteTransaction<'a> {
    runtime: &'a Runtime,
    tx: Transaction<'static, Sqlite>,
}

impl StoreTransaction for SqliteTransaction<'_> {
    fn get_product(&mut self, id: ProductId) -> StoreResult<Option<Product>> {
        self.runtime.block_on(fetch_product(&mut *self.tx, id))
    }

    fn set_stock(
        &mut self,
        id: ProductId,
        expected: ExpectedStock,
        new_stock: u32,
    ) -> StoreResult<Product> {
        let current = self
            .runtime
            .block_on(fetch_product(&mut *self.tx, id))?
            .ok_or(StoreError::ProductNotFound(id))?;
        expected.check(current.stock)?;

        let now = super::now();
        let result = self.runtime.block_on(
            sqlx::query(
                r#"
                UPDATE products
                SET stock = ?1,
                    updated_at = ?2
                WHERE id = ?3 AND stock = ?4
                "#,
            )
            .bind(i64::from(new_stock))
            .bind(encode_timestamp(now))
            .bind(id.get())
            .bind(i64::from(current.stock))
            .execute(&mut *self.tx),
        )?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "stock of product {id} changed during the update"
            )));
        }

        Ok(Product {
            stock: new_stock,
            updated_at: now,
            ..current
        })
    }

    fn insert_history(&mut self, entry: NewStockHistoryEntry) -> StoreResult<StockHistoryEntry> {
        self.runtime
            .block_on(append_history(&mut self.tx, entry, super::now()))
    }
}

async fn fetch_product<'c, E>(executor: E, id: ProductId) -> StoreResult<Option<Product>>
where
    E: Executor<'c, Database = Sqlite>,
{
    let row = sqlx::query(
        r#"
        SELECT id, name, description, price, stock, brand, created_at, updated_at
        FROM products
        WHERE id = ?1
        "#,
    )
    .bind(id.get())
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(product_from_row).transpose()
}

/// Must run inside a transaction: the latest stored timestamp is read first
/// and `created_at` is clamped to it, so history order follows insertion order.
async fn append_history(
    conn: &mut SqliteConnection,
    entry: NewStockHistoryEntry,
    now: DateTime<Utc>,
) -> StoreResult<StockHistoryEntry> {
    let latest: Option<String> = sqlx::query_scalar("SELECT MAX(created_at) FROM stock_history")
        .fetch_one(&mut *conn)
        .await?;
    let now = match latest {
        Some(raw) => now.max(decode_timestamp(raw)?),
        None => now,
    };

    let result = sqlx::query(
        r#"
        INSERT INTO stock_history (
            product_id,
            old_stock,
            new_stock,
            change_type,
            reason,
            created_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(entry.product_id.get())
    .bind(i64::from(entry.old_stock))
    .bind(i64::from(entry.new_stock))
    .bind(entry.change_type.as_str())
    .bind(&entry.reason)
    .bind(encode_timestamp(now))
    .execute(&mut *conn)
    .await?;

    let id = HistoryEntryId::new(result.last_insert_rowid());
    Ok(StockHistoryEntry::from_new(id, entry, now))
}

fn product_from_row(row: &SqliteRow) -> StoreResult<Product> {
    Ok(Product {
        id: ProductId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: decode_price(row.try_get("price")?)?,
        stock: decode_count(row.try_get("stock")?, "stock")?,
        brand: row.try_get("brand")?,
        created_at: decode_timestamp(row.try_get("created_at")?)?,
        updated_at: decode_timestamp(row.try_get("updated_at")?)?,
    })
}

fn record_from_row(row: &SqliteRow) -> StoreResult<HistoryRecord> {
    let entry = StockHistoryEntry {
        id: HistoryEntryId::new(row.try_get("id")?),
        product_id: ProductId::new(row.try_get("product_id")?),
        old_stock: decode_count(row.try_get("old_stock")?, "old_stock")?,
        new_stock: decode_count(row.try_get("new_stock")?, "new_stock")?,
        change_type: ChangeType::new(row.try_get::<String, _>("change_type")?),
        reason: row.try_get("reason")?,
        created_at: decode_timestamp(row.try_get("created_at")?)?,
    };

    Ok(HistoryRecord {
        entry,
        product_name: row.try_get("product_name")?,
    })
}

fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(raw: String) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::storage(format!("invalid timestamp '{raw}': {e}")))
}

fn decode_price(raw: String) -> StoreResult<Decimal> {
    Decimal::from_str(&raw).map_err(|e| StoreError::storage(format!("invalid price '{raw}': {e}")))
}

fn decode_count(raw: i64, column: &str) -> StoreResult<u32> {
    u32::try_from(raw).map_err(|_| StoreError::storage(format!("{column} out of range: {raw}")))
}
