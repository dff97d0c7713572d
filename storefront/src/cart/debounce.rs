//! Quantity write coalescing.
//!
//! Rapid taps on a line's increment control would otherwise each rewrite
//! the bucket. Increments accumulate per line and are applied once after a
//! quiet period; decrements and explicit quantity sets apply immediately,
//! flushing whatever was pending for that line first.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::warn;

use crate::cart::store::CartStore;
use crate::utils::AppResult;

type RowKey = (Option<String>, usize);

struct Pending {
    delta: u32,
    handle: JoinHandle<()>,
}

/// Debounced quantity edits on top of a [`CartStore`].
///
/// Dropping the debouncer aborts pending timers without applying them;
/// callers that care should [`flush_all`](Self::flush_all) first.
pub struct QuantityDebouncer {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<CartStore>,
    delay: Duration,
    pending: Mutex<HashMap<RowKey, Pending>>,
}

impl Inner {
    /// Detach a line's pending delta, cancelling its timer.
    fn take(&self, key: &RowKey) -> Option<u32> {
        self.pending.lock().unwrap().remove(key).map(|p| {
            p.handle.abort();
            p.delta
        })
    }

    fn apply(&self, key: &RowKey, delta: u32) {
        let (user, index) = (key.0.as_deref(), key.1);
        let result = self.store.items(user).and_then(|items| {
            let Some(line) = items.get(index) else {
                // Line removed while the delta was pending.
                return Ok(());
            };
            self.store
                .update_quantity(user, index, line.quantity.saturating_add(delta))
        });
        if let Err(e) = result {
            warn!("applying pending quantity change failed: {e}");
        }
    }

    fn flush_key(&self, key: &RowKey) {
        if let Some(delta) = self.take(key) {
            self.apply(key, delta);
        }
    }
}

impl QuantityDebouncer {
    pub fn new(store: Arc<CartStore>, delay: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                delay,
                pending: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Add one to a line's pending delta and restart its quiet-period timer.
    pub fn increment(&self, user_id: Option<&str>, index: usize) {
        let key: RowKey = (user_id.map(str::to_string), index);
        let delta = self.inner.take(&key).unwrap_or(0) + 1;

        let inner = self.inner.clone();
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(inner.delay).await;
            inner.flush_key(&task_key);
        });
        self.inner
            .pending
            .lock()
            .unwrap()
            .insert(key, Pending { delta, handle });
    }

    /// Subtract one immediately, after flushing the line's pending delta.
    /// Quantities floor at 1; removal is a separate, explicit action.
    pub fn decrement(&self, user_id: Option<&str>, index: usize) -> AppResult<()> {
        let key: RowKey = (user_id.map(str::to_string), index);
        self.inner.flush_key(&key);
        let items = self.inner.store.items(user_id)?;
        let Some(line) = items.get(index) else {
            return Ok(());
        };
        self.inner
            .store
            .update_quantity(user_id, index, line.quantity.saturating_sub(1).max(1))
    }

    /// Set a line's quantity immediately, discarding any pending delta.
    /// Zero removes the line.
    pub fn set_quantity(&self, user_id: Option<&str>, index: usize, quantity: u32) -> AppResult<()> {
        let key: RowKey = (user_id.map(str::to_string), index);
        self.inner.take(&key);
        self.inner.store.update_quantity(user_id, index, quantity)
    }

    /// Apply every pending delta now.
    pub fn flush_all(&self) {
        let keys: Vec<RowKey> = self.inner.pending.lock().unwrap().keys().cloned().collect();
        for key in keys {
            self.inner.flush_key(&key);
        }
    }
}

impl Drop for QuantityDebouncer {
    fn drop(&mut self) {
        for pending in self.inner.pending.lock().unwrap().values() {
            pending.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKvStore;
    use shared::CartItem;

    const DELAY: Duration = Duration::from_millis(600);

    fn seeded_store(quantity: u32) -> Arc<CartStore> {
        let store = Arc::new(CartStore::new(Arc::new(MemoryKvStore::new())));
        store
            .add_item(
                None,
                CartItem {
                    product_id: 1,
                    product_name: "Mozzarella".into(),
                    configuration: [("formato", "250g")].into_iter().collect(),
                    image_url: None,
                    quantity,
                },
            )
            .unwrap();
        store
    }

    fn quantity(store: &CartStore) -> u32 {
        store.items(None).unwrap()[0].quantity
    }

    #[tokio::test(start_paused = true)]
    async fn test_increments_coalesce_into_one_write() {
        let store = seeded_store(1);
        let debouncer = QuantityDebouncer::new(store.clone(), DELAY);

        debouncer.increment(None, 0);
        debouncer.increment(None, 0);
        debouncer.increment(None, 0);
        assert_eq!(quantity(&store), 1);

        tokio::time::sleep(DELAY + Duration::from_millis(10)).await;
        assert_eq!(quantity(&store), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_increment_restarts_the_timer() {
        let store = seeded_store(1);
        let debouncer = QuantityDebouncer::new(store.clone(), DELAY);

        debouncer.increment(None, 0);
        tokio::time::sleep(Duration::from_millis(400)).await;
        debouncer.increment(None, 0);
        tokio::time::sleep(Duration::from_millis(400)).await;
        // 800ms in, but the last tap was only 400ms ago.
        assert_eq!(quantity(&store), 1);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(quantity(&store), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_decrement_flushes_then_applies() {
        let store = seeded_store(1);
        let debouncer = QuantityDebouncer::new(store.clone(), DELAY);

        debouncer.increment(None, 0);
        debouncer.increment(None, 0);
        debouncer.decrement(None, 0).unwrap();
        assert_eq!(quantity(&store), 2);

        // Nothing left pending.
        tokio::time::sleep(DELAY + Duration::from_millis(10)).await;
        assert_eq!(quantity(&store), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_zero_removes_and_discards_pending() {
        let store = seeded_store(3);
        let debouncer = QuantityDebouncer::new(store.clone(), DELAY);

        debouncer.increment(None, 0);
        debouncer.set_quantity(None, 0, 0).unwrap();
        assert!(store.items(None).unwrap().is_empty());

        tokio::time::sleep(DELAY + Duration::from_millis(10)).await;
        assert!(store.items(None).unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_all_applies_immediately() {
        let store = seeded_store(1);
        let debouncer = QuantityDebouncer::new(store.clone(), DELAY);

        debouncer.increment(None, 0);
        debouncer.flush_all();
        assert_eq!(quantity(&store), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lines_debounce_independently() {
        let store = seeded_store(1);
        store
            .add_item(
                None,
                CartItem {
                    product_id: 2,
                    product_name: "Ricotta".into(),
                    configuration: shared::Configuration::default(),
                    image_url: None,
                    quantity: 5,
                },
            )
            .unwrap();
        let debouncer = QuantityDebouncer::new(store.clone(), DELAY);

        debouncer.increment(None, 0);
        debouncer.increment(None, 1);
        debouncer.increment(None, 1);
        tokio::time::sleep(DELAY + Duration::from_millis(10)).await;

        let items = store.items(None).unwrap();
        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[1].quantity, 7);
    }
}
