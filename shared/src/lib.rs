//! Shared domain types for the storefront workspace.
//!
//! Everything that crosses the boundary between the engine and the hosted
//! platform client lives here: the catalog model (products, attributes,
//! valid combinations), the normalized [`Configuration`] map, cart and order
//! types, and the service-window/quota types.

pub mod configuration;
pub mod models;
pub mod util;

pub use configuration::Configuration;
pub use models::{
    Attribute, AttributeValue, CartItem, DailyQuota, MAX_QUANTITY, MediaRow, Order, OrderLine,
    OrderStatus, Product, ServiceWindow, ValidCombination,
};
