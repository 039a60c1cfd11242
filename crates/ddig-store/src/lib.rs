//! Append-only record persistence.
//!
//! Each [`Category`] is an independent log. Appends within a category are
//! mutually exclusive and land whole; reads never observe a half-written
//! record. Two backends implement [`RecordStore`]: line-delimited JSON files
//! ([`JsonlStore`]) and a single SQLite database ([`SqliteStore`]).

pub mod error;
pub mod jsonl;
pub mod query;
pub mod schema;
pub mod sqlite;

use ddig_core::{Category, Record};

pub use error::StoreError;
pub use jsonl::JsonlStore;
pub use query::{ListQuery, Order, RecordId, DEFAULT_LIST_LIMIT};
pub use sqlite::SqliteStore;

/// Durable, append-only storage for every record category.
pub trait RecordStore: Send + Sync {
    /// Append one record. Fails with [`StoreError::Conflict`] when the
    /// record's natural id already exists, or when `record` belongs to a
    /// different category.
    fn append(&self, category: Category, record: &Record) -> Result<RecordId, StoreError>;

    fn list(&self, category: Category, query: &ListQuery) -> Result<Vec<Record>, StoreError>;

    /// Look a record up by natural id.
    fn get(&self, category: Category, id: &str) -> Result<Record, StoreError>;
}

pub(crate) fn check_category(category: Category, record: &Record) -> Result<(), StoreError> {
    if record.category() == category {
        Ok(())
    } else {
        Err(StoreError::Conflict(format!(
            "{} record cannot be appended to {category}",
            record.category()
        )))
    }
}
