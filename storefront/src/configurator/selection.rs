//! In-progress selection for one product.

use shared::{Configuration, Product};

/// The user's in-progress assignment of values to attributes for one
/// product. Built incrementally; only ever valid as a prefix-consistent
/// chain: changing the value at position *i* clears every selection at a
/// later position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    config: Configuration,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or clear, when `value` is empty) the choice for one attribute,
    /// then drop every choice at a later display position.
    pub fn set(&mut self, product: &Product, key: &str, value: &str) {
        let Some(position) = product.attribute_position(key) else {
            return;
        };
        self.config.insert(key, value);

        for attr in product.attributes_in_order().into_iter().skip(position + 1) {
            self.config.remove(&attr.config_key);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.config.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.config.is_empty()
    }

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    /// Stable identity of this selection's content, for memo keys.
    pub fn fingerprint(&self) -> String {
        self.config.cache_key()
    }

    /// Chosen values of the attributes strictly before `position`, as a
    /// partial configuration (unchosen keys are simply absent).
    pub fn prefix_before(&self, product: &Product, position: usize) -> Configuration {
        product
            .attributes_in_order()
            .into_iter()
            .take(position)
            .filter_map(|a| self.config.get(&a.config_key).map(|v| (a.config_key.as_str(), v)))
            .collect()
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for Selection {
    /// Build a selection directly from entries, without prefix clearing.
    /// Used when restoring a selection that is already known consistent
    /// (cart items, order history rows).
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            config: iter.into_iter().collect(),
        }
    }
}
