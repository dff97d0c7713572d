//! Key-value storage abstraction.
//!
//! The storefront persists a handful of small things locally: cart buckets,
//! the cached service window, onboarding flags. All of them go through
//! [`KvStore`] so the medium is swappable: a redb file in the application,
//! an in-memory map in tests.

mod memory;
mod redb_store;

use serde::Serialize;
use serde::de::DeserializeOwned;

pub use memory::MemoryKvStore;
pub use redb_store::RedbKvStore;

use crate::utils::AppResult;

/// Minimal string key-value store. Operations are synchronous; every backend
/// is a fast local medium.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> AppResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> AppResult<()>;
    fn remove(&self, key: &str) -> AppResult<()>;
}

/// JSON helpers over any [`KvStore`].
pub trait KvStoreExt: KvStore {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        match self.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> AppResult<()> {
        self.set(key, &serde_json::to_string(value)?)
    }
}

impl<S: KvStore + ?Sized> KvStoreExt for S {}
