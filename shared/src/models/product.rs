//! Product Model

use serde::{Deserialize, Serialize};

use crate::configuration::normalize;
use crate::models::combination::ValidCombination;

/// A configurable attribute of a product (e.g. "tipologia", "formato").
///
/// Display order defines the total sequence used to decide which attribute
/// is "next" to unlock; `attribute_id` is the tie-breaker when orders are
/// equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute {
    pub attribute_id: i64,
    pub product_id: i64,
    /// Normalized lowercase identifier, unique within a product.
    pub config_key: String,
    /// Human-readable label shown on the form.
    pub name: String,
    pub required: bool,
    pub display_order: i32,
}

/// One legal value for an attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeValue {
    pub value_id: i64,
    pub attribute_id: i64,
    /// Raw display text ("Fior di Latte"); comparisons go through
    /// [`normalized`](AttributeValue::normalized).
    pub value: String,
    pub description: Option<String>,
    pub display_order: i32,
    pub visible: bool,
}

impl AttributeValue {
    /// Value as compared against combinations and selections.
    pub fn normalized(&self) -> String {
        normalize(&self.value)
    }
}

/// Product entity: catalog row plus its embedded attribute schema and the
/// precomputed table of valid attribute combinations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    /// Static fallback image, used whenever no per-configuration image
    /// resolves.
    pub default_image: String,
    pub attributes: Vec<Attribute>,
    pub values: Vec<AttributeValue>,
    pub combinations: Vec<ValidCombination>,
}

impl Product {
    /// Attributes sorted by display order (attribute id as secondary key).
    pub fn attributes_in_order(&self) -> Vec<&Attribute> {
        let mut attrs: Vec<&Attribute> = self.attributes.iter().collect();
        attrs.sort_by_key(|a| (a.display_order, a.attribute_id));
        attrs
    }

    /// Position of an attribute in display order, by configuration key.
    pub fn attribute_position(&self, config_key: &str) -> Option<usize> {
        let key = normalize(config_key);
        self.attributes_in_order()
            .iter()
            .position(|a| a.config_key == key)
    }

    pub fn attribute(&self, config_key: &str) -> Option<&Attribute> {
        let key = normalize(config_key);
        self.attributes.iter().find(|a| a.config_key == key)
    }

    /// Visible values of one attribute, sorted by display order (value id as
    /// secondary key).
    pub fn values_of(&self, attribute_id: i64) -> Vec<&AttributeValue> {
        let mut values: Vec<&AttributeValue> = self
            .values
            .iter()
            .filter(|v| v.attribute_id == attribute_id && v.visible)
            .collect();
        values.sort_by_key(|v| (v.display_order, v.value_id));
        values
    }

    /// Configuration keys in display order, for rendering cart/order lines.
    pub fn key_order(&self) -> Vec<&str> {
        self.attributes_in_order()
            .into_iter()
            .map(|a| a.config_key.as_str())
            .collect()
    }
}
