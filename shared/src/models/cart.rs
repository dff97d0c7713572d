//! Cart Model

use serde::{Deserialize, Serialize};

use crate::configuration::Configuration;

/// Maximum quantity accepted for a single cart row.
pub const MAX_QUANTITY: u32 = 9999;

/// One line of the in-progress order, persisted in the local key-value
/// store. Two items with the same product and an equal normalized
/// configuration are merged (quantities summed) rather than duplicated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: i64,
    pub product_name: String,
    pub configuration: Configuration,
    /// Image resolved for this exact configuration at add time.
    pub image_url: Option<String>,
    pub quantity: u32,
}

impl CartItem {
    /// Same product, semantically equal configuration.
    pub fn same_line(&self, other: &CartItem) -> bool {
        self.product_id == other.product_id && self.configuration.matches(&other.configuration)
    }
}
