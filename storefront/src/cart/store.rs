//! Persistent cart buckets.
//!
//! One bucket per identity: `cart_<user_id>` for signed-in users,
//! `cart_guest` otherwise. Buckets are JSON arrays of [`CartItem`] in a
//! [`KvStore`]. Every mutation broadcasts a [`CartEvent`] naming the bucket
//! it touched so any number of views can re-render.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use shared::{CartItem, MAX_QUANTITY};
use tokio::sync::broadcast;
use tracing::info;

use crate::kv::{KvStore, KvStoreExt};
use crate::utils::{AppError, AppResult};

const GUEST_BUCKET: &str = "cart_guest";
/// Pre-bucket storage key from before carts were segregated by identity.
const LEGACY_KEY: &str = "cart";

const EVENT_CAPACITY: usize = 32;

/// Emitted after every cart mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartEvent {
    pub bucket: String,
}

/// Cart persistence and merge logic over a [`KvStore`].
pub struct CartStore {
    kv: Arc<dyn KvStore>,
    events: broadcast::Sender<CartEvent>,
    legacy_checked: AtomicBool,
}

impl CartStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            kv,
            events,
            legacy_checked: AtomicBool::new(false),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.events.subscribe()
    }

    pub fn bucket_key(user_id: Option<&str>) -> String {
        match user_id {
            Some(user) => format!("cart_{user}"),
            None => GUEST_BUCKET.to_string(),
        }
    }

    fn notify(&self, bucket: &str) {
        // Nobody listening is fine.
        let _ = self.events.send(CartEvent {
            bucket: bucket.to_string(),
        });
    }

    /// Move a cart stored under the pre-bucket key into the guest bucket.
    /// Runs once per store; later calls are free.
    fn migrate_legacy(&self) -> AppResult<()> {
        if self.legacy_checked.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let Some(raw) = self.kv.get(LEGACY_KEY)? else {
            return Ok(());
        };
        if self.kv.get(GUEST_BUCKET)?.is_none() {
            info!("migrating legacy cart key to guest bucket");
            self.kv.set(GUEST_BUCKET, &raw)?;
        }
        self.kv.remove(LEGACY_KEY)
    }

    fn load(&self, bucket: &str) -> AppResult<Vec<CartItem>> {
        self.migrate_legacy()?;
        Ok(self.kv.get_json(bucket)?.unwrap_or_default())
    }

    fn save(&self, bucket: &str, items: &[CartItem]) -> AppResult<()> {
        if items.is_empty() {
            self.kv.remove(bucket)?;
        } else {
            self.kv.set_json(bucket, &items)?;
        }
        self.notify(bucket);
        Ok(())
    }

    pub fn items(&self, user_id: Option<&str>) -> AppResult<Vec<CartItem>> {
        self.load(&Self::bucket_key(user_id))
    }

    /// Add an item, merging into an existing line when product and
    /// configuration coincide. Configurations compare normalized, so case
    /// and whitespace differences still merge. Quantities saturate at
    /// [`MAX_QUANTITY`].
    pub fn add_item(&self, user_id: Option<&str>, item: CartItem) -> AppResult<()> {
        if item.quantity == 0 {
            return Err(AppError::validation("cannot add an item with quantity 0"));
        }
        let bucket = Self::bucket_key(user_id);
        let mut items = self.load(&bucket)?;
        match items.iter_mut().find(|existing| existing.same_line(&item)) {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .saturating_add(item.quantity)
                    .min(MAX_QUANTITY);
            }
            None => {
                let mut item = item;
                item.quantity = item.quantity.min(MAX_QUANTITY);
                items.push(item);
            }
        }
        self.save(&bucket, &items)
    }

    pub fn remove_item(&self, user_id: Option<&str>, index: usize) -> AppResult<()> {
        let bucket = Self::bucket_key(user_id);
        let mut items = self.load(&bucket)?;
        if index >= items.len() {
            return Err(AppError::validation(format!(
                "no cart line at index {index}"
            )));
        }
        items.remove(index);
        self.save(&bucket, &items)
    }

    /// Set the quantity of one line. Zero removes the line; anything else is
    /// clamped to `1..=MAX_QUANTITY`.
    pub fn update_quantity(
        &self,
        user_id: Option<&str>,
        index: usize,
        quantity: u32,
    ) -> AppResult<()> {
        if quantity == 0 {
            return self.remove_item(user_id, index);
        }
        let bucket = Self::bucket_key(user_id);
        let mut items = self.load(&bucket)?;
        let line = items.get_mut(index).ok_or_else(|| {
            AppError::validation(format!("no cart line at index {index}"))
        })?;
        line.quantity = quantity.clamp(1, MAX_QUANTITY);
        self.save(&bucket, &items)
    }

    pub fn clear(&self, user_id: Option<&str>) -> AppResult<()> {
        let bucket = Self::bucket_key(user_id);
        self.kv.remove(&bucket)?;
        self.notify(&bucket);
        Ok(())
    }

    /// On sign-in, adopt the guest cart as the user's cart, but only when
    /// the user has no bucket of their own yet. A single event is emitted
    /// for the user bucket.
    pub fn migrate_guest(&self, user_id: &str) -> AppResult<()> {
        self.migrate_legacy()?;
        let user_bucket = Self::bucket_key(Some(user_id));
        if self.kv.get(&user_bucket)?.is_some() {
            return Ok(());
        }
        let Some(raw) = self.kv.get(GUEST_BUCKET)? else {
            return Ok(());
        };
        info!("adopting guest cart for user {user_id}");
        self.kv.set(&user_bucket, &raw)?;
        self.kv.remove(GUEST_BUCKET)?;
        self.notify(&user_bucket);
        Ok(())
    }
}
