//! Persistence for products and stock history.
//!
//! Two backends implement [`InventoryStore`]:
//! - [`InMemoryInventoryStore`]: tests/dev
//! - [`SqliteInventoryStore`]: durable, file-backed

pub mod in_memory;
pub mod sqlite;
pub mod r#trait;

use chrono::{DateTime, SubsecRound, Utc};

pub use in_memory::InMemoryInventoryStore;
pub use sqlite::SqliteInventoryStore;
pub use r#trait::{DEFAULT_HISTORY_LIMIT, InventoryStore, StoreError, StoreResult, StoreTransaction};

/// Current time at the precision both backends persist (microseconds).
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
