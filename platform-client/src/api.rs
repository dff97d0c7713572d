//! Platform API trait.

use std::collections::HashMap;

use async_trait::async_trait;
use shared::{DailyQuota, MediaRow, Order, OrderLine, OrderStatus, Product, ServiceWindow};

use crate::error::ClientResult;

/// The storefront's only external boundary: reads and writes against the
/// hosted database/identity platform.
///
/// Implementations must be cheap to clone behind an `Arc` and safe to share
/// across tasks.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    /// Visible products joined with their attributes, values and valid
    /// combinations, ordered by the stored display order.
    async fn fetch_catalog(&self) -> ClientResult<Vec<Product>>;

    /// All dynamic image/code rows for a set of products, in one query.
    async fn fetch_media_rows(&self, product_ids: &[i64]) -> ClientResult<Vec<MediaRow>>;

    /// Default images for products, keyed by product id. Used by batch
    /// prefetch for the subset of products lacking any dynamic rows.
    async fn fetch_default_images(
        &self,
        product_ids: &[i64],
    ) -> ClientResult<HashMap<i64, String>>;

    /// Current ordering hours.
    async fn fetch_service_window(&self) -> ClientResult<ServiceWindow>;

    /// Remote procedure: is today a valid ordering day for this user, and
    /// how many orders have they placed against the daily maximum.
    async fn daily_quota(&self, user_id: &str) -> ClientResult<DailyQuota>;

    /// Insert a new order header; returns the platform-assigned order id.
    async fn insert_order(&self, user_id: &str) -> ClientResult<i64>;

    /// Insert the lines of an order.
    async fn insert_order_lines(&self, order_id: i64, lines: &[OrderLine]) -> ClientResult<()>;

    /// Update the status of an existing order.
    async fn update_order_status(&self, order_id: i64, status: OrderStatus) -> ClientResult<()>;

    /// Order history for a user, newest first.
    async fn fetch_order_history(&self, user_id: &str) -> ClientResult<Vec<Order>>;
}
