//! Order Model

use serde::{Deserialize, Serialize};

use crate::configuration::Configuration;

/// Lifecycle status of a submitted order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Submitted,
    Completed,
    Cancelled,
    /// Header was created but line insertion failed; kept for
    /// administrative review, never deleted.
    Error,
}

/// One line of a submitted order, stored on the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: i64,
    pub product_name: String,
    pub configuration: Configuration,
    pub image_url: Option<String>,
    pub quantity: u32,
}

/// Order header with its lines, as returned by the order-history query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub user_id: String,
    /// Progressive per-user order number assigned by the platform.
    pub number: Option<i64>,
    /// Submission timestamp, UTC millis.
    pub placed_at: i64,
    pub status: OrderStatus,
    pub lines: Vec<OrderLine>,
}
