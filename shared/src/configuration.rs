//! Normalized product configuration map.
//!
//! A configuration assigns a value to some (not necessarily all) attributes
//! of a product, keyed by the attribute's configuration key. Keys and values
//! are normalized on insertion (lowercase, all whitespace stripped) so that
//! `"Tipologia" → " Fior di Latte "` and `"tipologia" → "fiordilatte"`
//! compare equal everywhere: cart merging, combination matching, cache keys.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Normalize a configuration key or value: lowercase, strip all whitespace.
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// A normalized, order-stable map from attribute configuration key to value.
///
/// Backed by a `BTreeMap` so iteration order (and therefore the serialized
/// form and [`cache_key`](Configuration::cache_key)) never depends on
/// insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration(BTreeMap<String, String>);

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, normalizing both key and value. An empty value
    /// removes the key instead.
    pub fn insert(&mut self, key: &str, value: &str) {
        let key = normalize(key);
        let value = normalize(value);
        if value.is_empty() {
            self.0.remove(&key);
        } else {
            self.0.insert(key, value);
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(&normalize(key))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(&normalize(key)).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(&normalize(key))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Exact match: same key set, same values. Order-independent by
    /// construction, case/whitespace-insensitive because both sides are
    /// normalized.
    pub fn matches(&self, other: &Configuration) -> bool {
        self.0 == other.0
    }

    /// Every entry present in `self` has the same value in `other`. Used to
    /// check whether a valid combination is consistent with the choices made
    /// so far (missing keys in `self` impose no constraint).
    pub fn is_satisfied_by(&self, other: &Configuration) -> bool {
        self.iter().all(|(k, v)| other.get(k) == Some(v))
    }

    /// Stable content-addressed key: `k1:v1|k2:v2|…` in key order. Unlike a
    /// raw JSON dump of an arbitrary map this can never be sensitive to key
    /// insertion order.
    pub fn cache_key(&self) -> String {
        let mut out = String::new();
        for (i, (k, v)) in self.iter().enumerate() {
            if i > 0 {
                out.push('|');
            }
            out.push_str(k);
            out.push(':');
            out.push_str(v);
        }
        out
    }

    /// Render `Key: value` lines following the order of `key_order`; keys
    /// not listed there come last in alphabetical order. Used for cart rows,
    /// order history lines and the PDF export.
    pub fn display_lines(&self, key_order: &[&str]) -> Vec<String> {
        let mut keys: Vec<&str> = self.keys().collect();
        keys.sort_by_key(|k| {
            key_order
                .iter()
                .position(|o| normalize(o) == *k)
                .unwrap_or(usize::MAX)
        });
        keys.into_iter()
            .map(|k| {
                let mut label: String = k.to_string();
                if let Some(first) = label.get_mut(0..1) {
                    first.make_ascii_uppercase();
                }
                format!("{}: {}", label, self.get(k).unwrap_or_default())
            })
            .collect()
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for Configuration {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut config = Configuration::new();
        for (k, v) in iter {
            config.insert(k.as_ref(), v.as_ref());
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization_on_insert() {
        let mut config = Configuration::new();
        config.insert("Tipologia", " Fior di Latte ");
        assert_eq!(config.get("tipologia"), Some("fiordilatte"));
        assert_eq!(config.get("TIPOLOGIA"), Some("fiordilatte"));
    }

    #[test]
    fn test_empty_value_removes_key() {
        let mut config = Configuration::new();
        config.insert("formato", "250g");
        config.insert("formato", "   ");
        assert!(!config.contains_key("formato"));
    }

    #[test]
    fn test_matches_is_order_and_case_independent() {
        let a: Configuration = [("a", "X"), ("b", "Y")].into_iter().collect();
        let b: Configuration = [("B", " y "), ("A", "x")].into_iter().collect();
        assert!(a.matches(&b));

        let c: Configuration = [("a", "X")].into_iter().collect();
        assert!(!a.matches(&c)); // different key count
    }

    #[test]
    fn test_is_satisfied_by_ignores_missing_keys() {
        let prefix: Configuration = [("tipologia", "bufala")].into_iter().collect();
        let full: Configuration = [("tipologia", "bufala"), ("formato", "250g")]
            .into_iter()
            .collect();
        assert!(prefix.is_satisfied_by(&full));
        assert!(!full.is_satisfied_by(&prefix));
    }

    #[test]
    fn test_cache_key_stable() {
        let a: Configuration = [("b", "2"), ("a", "1")].into_iter().collect();
        let b: Configuration = [("a", "1"), ("b", "2")].into_iter().collect();
        assert_eq!(a.cache_key(), "a:1|b:2");
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_display_lines_follow_key_order() {
        let config: Configuration = [("formato", "250g"), ("tipologia", "bufala")]
            .into_iter()
            .collect();
        let lines = config.display_lines(&["tipologia", "formato"]);
        assert_eq!(lines, vec!["Tipologia: bufala", "Formato: 250g"]);
    }
}
