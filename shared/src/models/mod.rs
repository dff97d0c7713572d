//! Domain models shared between the engine and the platform client.

mod cart;
mod combination;
mod hours;
mod order;
mod product;

pub use cart::{CartItem, MAX_QUANTITY};
pub use combination::{MediaRow, ValidCombination};
pub use hours::{DailyQuota, ServiceWindow};
pub use order::{Order, OrderLine, OrderStatus};
pub use product::{Attribute, AttributeValue, Product};
