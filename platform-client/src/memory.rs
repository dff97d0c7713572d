//! In-process implementation of [`PlatformApi`].
//!
//! Backed by plain in-memory tables. Zero network overhead, deterministic,
//! with per-endpoint failure injection and call counters so engine tests can
//! exercise degraded paths and assert how many round trips an operation
//! costs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use shared::{
    DailyQuota, MediaRow, Order, OrderLine, OrderStatus, Product, ServiceWindow,
};

use crate::api::PlatformApi;
use crate::error::{ClientError, ClientResult};

#[derive(Debug, Default)]
struct Tables {
    products: Vec<Product>,
    media_rows: Vec<MediaRow>,
    window: ServiceWindow,
    quota: Option<DailyQuota>,
    orders: Vec<Order>,
}

/// In-memory platform double.
#[derive(Debug, Default)]
pub struct MemoryPlatform {
    tables: RwLock<Tables>,
    next_order_id: AtomicI64,

    fail_media: AtomicBool,
    fail_default_images: AtomicBool,
    fail_window: AtomicBool,
    fail_insert_order: AtomicBool,
    fail_insert_lines: AtomicBool,

    media_fetches: AtomicUsize,
    default_image_fetches: AtomicUsize,
    window_fetches: AtomicUsize,
    last_media_ids: RwLock<Vec<i64>>,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self {
            next_order_id: AtomicI64::new(1),
            ..Default::default()
        }
    }

    pub fn with_products(self, products: Vec<Product>) -> Self {
        self.tables.write().unwrap().products = products;
        self
    }

    pub fn with_media_rows(self, rows: Vec<MediaRow>) -> Self {
        self.tables.write().unwrap().media_rows = rows;
        self
    }

    pub fn with_service_window(self, window: ServiceWindow) -> Self {
        self.tables.write().unwrap().window = window;
        self
    }

    pub fn with_quota(self, quota: DailyQuota) -> Self {
        self.tables.write().unwrap().quota = Some(quota);
        self
    }

    pub fn set_quota(&self, quota: DailyQuota) {
        self.tables.write().unwrap().quota = Some(quota);
    }

    // ========== Failure injection ==========

    pub fn fail_media_rows(&self, fail: bool) {
        self.fail_media.store(fail, Ordering::SeqCst);
    }

    pub fn fail_default_images(&self, fail: bool) {
        self.fail_default_images.store(fail, Ordering::SeqCst);
    }

    pub fn fail_service_window(&self, fail: bool) {
        self.fail_window.store(fail, Ordering::SeqCst);
    }

    pub fn fail_insert_order(&self, fail: bool) {
        self.fail_insert_order.store(fail, Ordering::SeqCst);
    }

    pub fn fail_insert_lines(&self, fail: bool) {
        self.fail_insert_lines.store(fail, Ordering::SeqCst);
    }

    // ========== Call counters ==========

    pub fn media_fetch_count(&self) -> usize {
        self.media_fetches.load(Ordering::SeqCst)
    }

    pub fn default_image_fetch_count(&self) -> usize {
        self.default_image_fetches.load(Ordering::SeqCst)
    }

    pub fn window_fetch_count(&self) -> usize {
        self.window_fetches.load(Ordering::SeqCst)
    }

    /// Product ids of the most recent media rows request.
    pub fn last_media_request(&self) -> Vec<i64> {
        self.last_media_ids.read().unwrap().clone()
    }

    /// Direct read access for assertions.
    pub fn stored_orders(&self) -> Vec<Order> {
        self.tables.read().unwrap().orders.clone()
    }

    fn injected(flag: &AtomicBool, what: &str) -> ClientResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(ClientError::Api {
                status: 503,
                message: format!("injected failure: {what}"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PlatformApi for MemoryPlatform {
    async fn fetch_catalog(&self) -> ClientResult<Vec<Product>> {
        Ok(self.tables.read().unwrap().products.clone())
    }

    async fn fetch_media_rows(&self, product_ids: &[i64]) -> ClientResult<Vec<MediaRow>> {
        self.media_fetches.fetch_add(1, Ordering::SeqCst);
        *self.last_media_ids.write().unwrap() = product_ids.to_vec();
        Self::injected(&self.fail_media, "media rows")?;
        Ok(self
            .tables
            .read()
            .unwrap()
            .media_rows
            .iter()
            .filter(|r| product_ids.contains(&r.product_id))
            .cloned()
            .collect())
    }

    async fn fetch_default_images(
        &self,
        product_ids: &[i64],
    ) -> ClientResult<HashMap<i64, String>> {
        self.default_image_fetches.fetch_add(1, Ordering::SeqCst);
        Self::injected(&self.fail_default_images, "default images")?;
        Ok(self
            .tables
            .read()
            .unwrap()
            .products
            .iter()
            .filter(|p| product_ids.contains(&p.id))
            .map(|p| (p.id, p.default_image.clone()))
            .collect())
    }

    async fn fetch_service_window(&self) -> ClientResult<ServiceWindow> {
        self.window_fetches.fetch_add(1, Ordering::SeqCst);
        Self::injected(&self.fail_window, "service window")?;
        Ok(self.tables.read().unwrap().window.clone())
    }

    async fn daily_quota(&self, _user_id: &str) -> ClientResult<DailyQuota> {
        self.tables
            .read()
            .unwrap()
            .quota
            .clone()
            .ok_or_else(|| ClientError::NotFound("daily quota not configured".into()))
    }

    async fn insert_order(&self, user_id: &str) -> ClientResult<i64> {
        Self::injected(&self.fail_insert_order, "insert order")?;
        let id = self.next_order_id.fetch_add(1, Ordering::SeqCst);
        let mut tables = self.tables.write().unwrap();
        let number = tables
            .orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .count() as i64
            + 1;
        tables.orders.push(Order {
            id,
            user_id: user_id.to_string(),
            number: Some(number),
            placed_at: shared::util::now_millis(),
            status: OrderStatus::Submitted,
            lines: Vec::new(),
        });
        Ok(id)
    }

    async fn insert_order_lines(&self, order_id: i64, lines: &[OrderLine]) -> ClientResult<()> {
        Self::injected(&self.fail_insert_lines, "insert order lines")?;
        let mut tables = self.tables.write().unwrap();
        let order = tables
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or_else(|| ClientError::NotFound(format!("order {order_id}")))?;
        order.lines.extend_from_slice(lines);
        Ok(())
    }

    async fn update_order_status(&self, order_id: i64, status: OrderStatus) -> ClientResult<()> {
        let mut tables = self.tables.write().unwrap();
        let order = tables
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or_else(|| ClientError::NotFound(format!("order {order_id}")))?;
        order.status = status;
        Ok(())
    }

    async fn fetch_order_history(&self, user_id: &str) -> ClientResult<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .tables
            .read()
            .unwrap()
            .orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by_key(|o| std::cmp::Reverse((o.placed_at, o.id)));
        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_order_numbers_are_per_user() {
        let platform = MemoryPlatform::new();
        platform.insert_order("anna").await.unwrap();
        platform.insert_order("bruno").await.unwrap();
        platform.insert_order("anna").await.unwrap();

        let anna = platform.fetch_order_history("anna").await.unwrap();
        assert_eq!(anna.len(), 2);
        assert_eq!(anna[0].number, Some(2));
        assert_eq!(anna[1].number, Some(1));

        let bruno = platform.fetch_order_history("bruno").await.unwrap();
        assert_eq!(bruno[0].number, Some(1));
    }

    #[tokio::test]
    async fn test_failure_injection_is_reversible() {
        let platform = MemoryPlatform::new();
        platform.fail_media_rows(true);
        assert!(platform.fetch_media_rows(&[1]).await.is_err());
        platform.fail_media_rows(false);
        assert!(platform.fetch_media_rows(&[1]).await.is_ok());
        assert_eq!(platform.media_fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_status_update_targets_one_order() {
        let platform = MemoryPlatform::new();
        let first = platform.insert_order("anna").await.unwrap();
        let second = platform.insert_order("anna").await.unwrap();
        platform
            .update_order_status(first, OrderStatus::Error)
            .await
            .unwrap();

        let orders = platform.stored_orders();
        assert_eq!(orders.iter().find(|o| o.id == first).unwrap().status, OrderStatus::Error);
        assert_eq!(
            orders.iter().find(|o| o.id == second).unwrap().status,
            OrderStatus::Submitted
        );
    }
}
