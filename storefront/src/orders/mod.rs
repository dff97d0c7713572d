//! Order submission and history.

use std::sync::Arc;

use platform_client::PlatformApi;
use shared::{Order, OrderLine, OrderStatus};
use tracing::{error, info};

use crate::cart::CartStore;
use crate::hours::{GateStatus, ServiceHoursGate};
use crate::utils::{AppError, AppResult};

/// Turns a cart bucket into a submitted order.
///
/// Submission is two platform writes: the order header, then its lines. A
/// header without lines is unusable, so a line failure marks the header
/// with an error status and leaves the cart untouched for a retry. The
/// cart is only cleared once both writes have landed.
pub struct OrderService {
    platform: Arc<dyn PlatformApi>,
    cart: Arc<CartStore>,
    gate: Arc<ServiceHoursGate>,
}

impl OrderService {
    pub fn new(
        platform: Arc<dyn PlatformApi>,
        cart: Arc<CartStore>,
        gate: Arc<ServiceHoursGate>,
    ) -> Self {
        Self {
            platform,
            cart,
            gate,
        }
    }

    /// Submit the user's cart. Returns the platform order id.
    pub async fn submit(&self, user_id: &str) -> AppResult<i64> {
        let items = self.cart.items(Some(user_id))?;
        if items.is_empty() {
            return Err(AppError::validation("cart is empty"));
        }
        if let GateStatus::Closed(reason) = self.gate.order_gate(user_id).await {
            return Err(AppError::OrderRejected(reason.to_string()));
        }

        let order_id = self.platform.insert_order(user_id).await?;
        let lines: Vec<OrderLine> = items
            .into_iter()
            .map(|item| OrderLine {
                product_id: item.product_id,
                product_name: item.product_name,
                configuration: item.configuration,
                image_url: item.image_url,
                quantity: item.quantity,
            })
            .collect();

        if let Err(e) = self.platform.insert_order_lines(order_id, &lines).await {
            error!("order {order_id}: line insert failed, marking errored: {e}");
            if let Err(status_err) = self
                .platform
                .update_order_status(order_id, OrderStatus::Error)
                .await
            {
                error!("order {order_id}: could not record error status: {status_err}");
            }
            return Err(e.into());
        }

        self.cart.clear(Some(user_id))?;
        info!("order {order_id} submitted for {user_id} ({} lines)", lines.len());
        Ok(order_id)
    }

    /// The user's orders, newest first.
    pub async fn history(&self, user_id: &str) -> AppResult<Vec<Order>> {
        Ok(self.platform.fetch_order_history(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKvStore;
    use crate::utils::FakeClock;
    use chrono::TimeZone;
    use platform_client::MemoryPlatform;
    use shared::{CartItem, DailyQuota};

    fn open_quota() -> DailyQuota {
        DailyQuota {
            is_order_day: true,
            orders_placed_today: 0,
            daily_maximum: 3,
        }
    }

    /// Tuesday 12:00 UTC, well inside the default window.
    fn noon_millis() -> i64 {
        chrono::Utc
            .with_ymd_and_hms(2026, 8, 25, 12, 0, 0)
            .unwrap()
            .timestamp_millis()
    }

    struct Fixture {
        platform: Arc<MemoryPlatform>,
        cart: Arc<CartStore>,
        service: OrderService,
    }

    fn fixture(platform: MemoryPlatform) -> Fixture {
        let platform = Arc::new(platform);
        let cart = Arc::new(CartStore::new(Arc::new(MemoryKvStore::new())));
        let gate = Arc::new(ServiceHoursGate::new(
            platform.clone(),
            Arc::new(MemoryKvStore::new()),
            Arc::new(FakeClock::new(noon_millis())),
            6 * 60 * 60 * 1000,
        ));
        let service = OrderService::new(platform.clone(), cart.clone(), gate);
        Fixture {
            platform,
            cart,
            service,
        }
    }

    fn seed_cart(cart: &CartStore, user: &str) {
        cart.add_item(
            Some(user),
            CartItem {
                product_id: 1,
                product_name: "Mozzarella".into(),
                configuration: [("tipologia", "bufala"), ("formato", "250g")]
                    .into_iter()
                    .collect(),
                image_url: Some("bufala.jpg".into()),
                quantity: 2,
            },
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_submit_writes_header_and_lines_then_clears_cart() {
        let f = fixture(MemoryPlatform::new().with_quota(open_quota()));
        seed_cart(&f.cart, "anna");

        let order_id = f.service.submit("anna").await.unwrap();
        let orders = f.platform.stored_orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].id, order_id);
        assert_eq!(orders[0].lines.len(), 1);
        assert_eq!(orders[0].lines[0].quantity, 2);
        assert_eq!(orders[0].status, shared::OrderStatus::Submitted);
        assert!(f.cart.items(Some("anna")).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected_locally() {
        let f = fixture(MemoryPlatform::new().with_quota(open_quota()));
        let err = f.service.submit("anna").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(f.platform.stored_orders().is_empty());
    }

    #[tokio::test]
    async fn test_closed_gate_rejects_before_any_write() {
        let f = fixture(MemoryPlatform::new().with_quota(DailyQuota {
            is_order_day: false,
            ..open_quota()
        }));
        seed_cart(&f.cart, "anna");

        let err = f.service.submit("anna").await.unwrap_err();
        assert!(matches!(err, AppError::OrderRejected(_)));
        assert!(f.platform.stored_orders().is_empty());
        assert_eq!(f.cart.items(Some("anna")).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_line_failure_marks_order_errored_and_keeps_cart() {
        let f = fixture(MemoryPlatform::new().with_quota(open_quota()));
        seed_cart(&f.cart, "anna");
        f.platform.fail_insert_lines(true);

        assert!(f.service.submit("anna").await.is_err());
        let orders = f.platform.stored_orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status, shared::OrderStatus::Error);
        assert!(orders[0].lines.is_empty());
        assert_eq!(f.cart.items(Some("anna")).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_history_newest_first() {
        let f = fixture(MemoryPlatform::new().with_quota(open_quota()));
        seed_cart(&f.cart, "anna");
        f.service.submit("anna").await.unwrap();
        seed_cart(&f.cart, "anna");
        f.service.submit("anna").await.unwrap();

        let history = f.service.history("anna").await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].id > history[1].id);
        assert_eq!(history[0].number, Some(2));
    }
}
