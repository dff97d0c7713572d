//! redb-backed key-value store.
//!
//! Single-table layout: key = string, value = string. Small values (cart
//! buckets, cached config) written with one transaction per operation;
//! durability over throughput, matching how little this store is written.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, TableDefinition};

use crate::kv::KvStore;
use crate::utils::{AppError, AppResult};

const KV_TABLE: TableDefinition<&str, &str> = TableDefinition::new("kv");

/// File-backed store for everything the browser kept in local storage.
#[derive(Debug, Clone)]
pub struct RedbKvStore {
    db: Arc<Database>,
}

// Every redb error type widens into the umbrella `redb::Error`, which
// `AppError` converts from; one extra hop keeps the call sites on `?`.
fn db_err(e: impl Into<redb::Error>) -> AppError {
    AppError::from(e.into())
}

impl RedbKvStore {
    /// Open (or create) the store at the given path.
    pub fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let db = Database::create(path).map_err(db_err)?;
        Ok(Self { db: Arc::new(db) })
    }

    /// In-memory database for testing.
    pub fn open_in_memory() -> AppResult<Self> {
        let db = Database::builder()
            .create_with_backend(redb::backends::InMemoryBackend::new())
            .map_err(db_err)?;
        Ok(Self { db: Arc::new(db) })
    }
}

impl KvStore for RedbKvStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        let txn = self.db.begin_read().map_err(db_err)?;
        let table = match txn.open_table(KV_TABLE) {
            Ok(table) => table,
            // Nothing written yet
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(db_err(e)),
        };
        let value = table
            .get(key)
            .map_err(db_err)?
            .map(|v| v.value().to_string());
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let txn = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = txn.open_table(KV_TABLE).map_err(db_err)?;
            table.insert(key, value).map_err(db_err)?;
        }
        txn.commit().map_err(db_err)
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        let txn = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = txn.open_table(KV_TABLE).map_err(db_err)?;
            table.remove(key).map_err(db_err)?;
        }
        txn.commit().map_err(db_err)
    }
}
