//! Combination Filter.
//!
//! For a product with ordered configurable attributes and a precomputed
//! table of valid attribute combinations, answers three questions about the
//! user's in-progress [`Selection`]:
//!
//! - is attribute *k* currently selectable at all,
//! - which values are legal for *k* given everything selected so far,
//! - is the selection, taken as a whole, complete and submittable.
//!
//! Selectability of *k* depends on availability at earlier positions, which
//! itself depends on selectability there; the definition terminates because
//! display order is a strict total order and every step only looks left.
//! All queries are pure over the already-loaded catalog data and never
//! suspend; "no valid values" is a legitimate terminal state, not an error.

mod selection;

use std::sync::Arc;

use dashmap::DashMap;
use shared::configuration::normalize;
use shared::{Attribute, AttributeValue, Configuration, Product};

use crate::utils::{AppError, AppResult};

pub use selection::Selection;

/// The availability memo is cleared outright when it grows past this many
/// entries. Selections are tiny and the memo is per product, so this is
/// rarely hit outside of pathological catalogs.
const MEMO_CAPACITY: usize = 512;

/// Selection-state machine over one product.
///
/// The naive availability filter is `O(|combinations| × |values|)` per query
/// and is asked on every form render, so results are memoized per
/// (attribute, selection fingerprint) in a content-addressed cache; a
/// changed selection produces a different fingerprint and simply misses.
#[derive(Debug)]
pub struct Configurator {
    product: Arc<Product>,
    memo: DashMap<String, Arc<Vec<AttributeValue>>>,
}

impl Configurator {
    pub fn new(product: Arc<Product>) -> Self {
        Self {
            product,
            memo: DashMap::new(),
        }
    }

    pub fn product(&self) -> &Product {
        &self.product
    }

    /// Whether the attribute identified by `key` can currently be chosen.
    ///
    /// Position 0 is always selectable. Every earlier attribute that has at
    /// least one available value under the current selection must already be
    /// chosen; earlier attributes with zero available values impose no
    /// constraint (a product may legitimately have attributes with no
    /// applicable values under certain branches, and those must not block
    /// downstream selection).
    pub fn is_selectable(&self, key: &str, selection: &Selection) -> bool {
        let Some(position) = self.product.attribute_position(key) else {
            return false;
        };
        if position == 0 {
            return true;
        }

        for earlier in self.product.attributes_in_order().into_iter().take(position) {
            let available = self.available_values(&earlier.config_key, selection);
            if available.is_empty() {
                continue;
            }
            if selection.get(&earlier.config_key).is_none() {
                return false;
            }
        }
        true
    }

    /// Values currently legal for the attribute identified by `key`.
    ///
    /// Empty when the attribute is not selectable. The first attribute's
    /// menu is always fully populated; later attributes retain only values
    /// for which at least one valid combination satisfies every earlier
    /// chosen value and assigns the candidate to the target attribute.
    /// Earlier attributes the user has left blank impose no constraint.
    pub fn available_values(&self, key: &str, selection: &Selection) -> Arc<Vec<AttributeValue>> {
        // Lookups below normalize the key, so the memo must too or spelling
        // variants of one attribute would each get their own entry.
        let memo_key = format!("{}|{}", normalize(key), selection.fingerprint());
        if let Some(hit) = self.memo.get(&memo_key) {
            return hit.value().clone();
        }

        let result = Arc::new(self.compute_available(key, selection));
        if self.memo.len() >= MEMO_CAPACITY {
            self.memo.clear();
        }
        self.memo.insert(memo_key, result.clone());
        result
    }

    fn compute_available(&self, key: &str, selection: &Selection) -> Vec<AttributeValue> {
        let Some(position) = self.product.attribute_position(key) else {
            return Vec::new();
        };
        let Some(attribute) = self.product.attribute(key) else {
            return Vec::new();
        };
        if !self.is_selectable(key, selection) {
            return Vec::new();
        }

        let values: Vec<AttributeValue> = self
            .product
            .values_of(attribute.attribute_id)
            .into_iter()
            .cloned()
            .collect();
        if position == 0 || self.product.combinations.is_empty() {
            return values;
        }

        let prefix = selection.prefix_before(&self.product, position);
        values
            .into_iter()
            .filter(|candidate| {
                let wanted = candidate.normalized();
                self.product.combinations.iter().any(|combo| {
                    prefix.is_satisfied_by(&combo.configuration)
                        && combo.configuration.get(&attribute.config_key) == Some(wanted.as_str())
                })
            })
            .collect()
    }

    /// Whether the selection is complete and submittable.
    ///
    /// Three checks, in order:
    /// 1. every attribute flagged required has a chosen value;
    /// 2. every selectable, non-required attribute with available values is
    ///    either chosen or provably skippable — some combination consistent
    ///    with the choices so far leaves it blank;
    /// 3. when the product has combinations and anything is selected, an
    ///    exact field-for-field match is looked for; if none exists the
    ///    decision falls back to check 1 alone (the combination table has
    ///    known gaps, and a missing row must not lock users out).
    pub fn is_complete(&self, selection: &Selection) -> bool {
        let attrs = self.product.attributes_in_order();

        // 1. Flag-required attributes.
        let required_ok = attrs
            .iter()
            .filter(|a| a.required)
            .all(|a| selection.get(&a.config_key).is_some());
        if !required_ok {
            return false;
        }

        // 2. Structurally required attributes.
        for attr in attrs.iter().filter(|a| !a.required) {
            if selection.get(&attr.config_key).is_some() {
                continue;
            }
            if !self.is_selectable(&attr.config_key, selection) {
                continue;
            }
            if self.available_values(&attr.config_key, selection).is_empty() {
                continue;
            }
            if !self.is_skippable(&attr.config_key, selection.configuration()) {
                return false;
            }
        }

        // 3. Exact match against the combination table.
        if !self.product.combinations.is_empty() && !selection.is_empty() {
            let exact_exists = self
                .product
                .combinations
                .iter()
                .any(|combo| self.matches_exactly(&combo.configuration, selection));
            if !exact_exists {
                // Gap in the precomputed table; the required check decided.
                return required_ok;
            }
        }

        true
    }

    /// Some combination consistent with the selection so far leaves this
    /// attribute blank.
    fn is_skippable(&self, key: &str, chosen: &Configuration) -> bool {
        self.product
            .combinations
            .iter()
            .filter(|combo| chosen.is_satisfied_by(&combo.configuration))
            .any(|combo| combo.configuration.get(key).is_none())
    }

    /// Field-for-field match over the product's full attribute set: chosen
    /// keys must agree, unchosen keys must be absent from the combination.
    fn matches_exactly(&self, combo: &Configuration, selection: &Selection) -> bool {
        self.product.attributes_in_order().into_iter().all(|attr| {
            match selection.get(&attr.config_key) {
                Some(value) => combo.get(&attr.config_key) == Some(value),
                None => combo.get(&attr.config_key).is_none(),
            }
        })
    }

    /// Guard for add-to-cart: a selection that is not complete is rejected
    /// naming the first attribute still to choose.
    pub fn ensure_complete(&self, selection: &Selection) -> AppResult<()> {
        if self.is_complete(selection) {
            return Ok(());
        }
        let attribute = self
            .first_blocking_attribute(selection)
            .map(|a| a.name.clone())
            .unwrap_or_else(|| "configurazione".to_string());
        Err(AppError::Incomplete { attribute })
    }

    /// First attribute, in display order, that is selectable, has options,
    /// and is still unchosen. Drives the "choose X first" message on forced
    /// submit attempts.
    pub fn first_blocking_attribute(&self, selection: &Selection) -> Option<&Attribute> {
        let attrs = self.product.attributes_in_order();
        let blocking = attrs.into_iter().find(|attr| {
            selection.get(&attr.config_key).is_none()
                && self.is_selectable(&attr.config_key, selection)
                && !self.available_values(&attr.config_key, selection).is_empty()
        })?;
        // Re-borrow from self to decouple the lifetime from the sorted Vec.
        self.product.attribute(&blocking.config_key)
    }
}
