//! Valid combinations and dynamic media rows.

use serde::{Deserialize, Serialize};

use crate::configuration::Configuration;

/// A precomputed, possibly-partial assignment of attributes to values that
/// the storefront accepts for a product. A combination need not assign every
/// attribute: partial combinations represent intermediate configurations
/// whose image/code may or may not exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidCombination {
    pub id: i64,
    pub product_id: i64,
    pub configuration: Configuration,
    /// Short opaque product code shown next to the configured product.
    pub code: Option<String>,
}

/// Per-configuration display row fetched from the platform: the image and
/// code associated with one exact configuration of a product. This is the
/// payload of the derived-data cache's Level 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRow {
    pub id: i64,
    pub product_id: i64,
    pub configuration: Configuration,
    pub image_url: Option<String>,
    pub code: Option<String>,
    /// Explicitly flagged fallback row for the product.
    #[serde(default)]
    pub is_default: bool,
}
