//! Two-level TTL cache for media lookups.
//!
//! L1 holds raw media rows and the default image per product. L2 holds the
//! fully resolved answer per (product, configuration) pair, keyed by the
//! configuration's stable cache key. Both levels share one TTL. Entries
//! written after a fetch failure carry a timestamp backdated by half the
//! TTL, so a failure recorded at the same instant as a success always
//! expires first and the next lookup retries sooner.

use std::sync::Arc;

use dashmap::DashMap;
use shared::{Configuration, MediaRow};

use crate::utils::Clock;

#[derive(Debug, Clone)]
pub(crate) struct RowsEntry {
    pub rows: Arc<Vec<MediaRow>>,
    pub default_image: Option<String>,
    /// Written after a fetch failure. Derived resolved entries inherit the
    /// shortened error lifetime while this is set.
    pub degraded: bool,
    fetched_at: i64,
}

#[derive(Debug, Clone)]
pub(crate) struct ResolvedEntry {
    pub image_url: Option<String>,
    pub code: Option<String>,
    cached_at: i64,
}

/// Shared cache behind the media resolver. Cheap to clone.
#[derive(Clone)]
pub struct MediaCache {
    rows: Arc<DashMap<i64, RowsEntry>>,
    resolved: Arc<DashMap<String, ResolvedEntry>>,
    ttl_ms: i64,
    clock: Arc<dyn Clock>,
}

impl MediaCache {
    pub fn new(ttl_ms: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            rows: Arc::new(DashMap::new()),
            resolved: Arc::new(DashMap::new()),
            ttl_ms,
            clock,
        }
    }

    fn is_fresh(&self, stamp: i64) -> bool {
        self.clock.now_millis() - stamp < self.ttl_ms
    }

    /// Rows for a product, only while fresh.
    pub(crate) fn rows(&self, product_id: i64) -> Option<RowsEntry> {
        let entry = self.rows.get(&product_id)?;
        if self.is_fresh(entry.fetched_at) {
            Some(entry.value().clone())
        } else {
            None
        }
    }

    /// Whether a product has ever been cached, fresh or not. Drives the
    /// prefetch ordering: never-seen products load before merely stale ones.
    pub(crate) fn has_any_rows(&self, product_id: i64) -> bool {
        self.rows.contains_key(&product_id)
    }

    pub(crate) fn put_rows(&self, product_id: i64, rows: Vec<MediaRow>) {
        self.rows.insert(
            product_id,
            RowsEntry {
                rows: Arc::new(rows),
                default_image: None,
                degraded: false,
                fetched_at: self.clock.now_millis(),
            },
        );
    }

    /// Record a fetch failure as an empty entry with a backdated timestamp.
    /// Half-life keeps repeated lookups from hammering the platform while
    /// still retrying before a real entry would expire.
    pub(crate) fn put_rows_error(&self, product_id: i64) {
        self.rows.insert(
            product_id,
            RowsEntry {
                rows: Arc::new(Vec::new()),
                default_image: None,
                degraded: true,
                fetched_at: self.clock.now_millis() - self.ttl_ms / 2,
            },
        );
    }

    /// Attach a bulk-fetched default image to an existing rows entry.
    pub(crate) fn put_default_image(&self, product_id: i64, image: Option<String>) {
        if let Some(mut entry) = self.rows.get_mut(&product_id) {
            entry.default_image = image;
        }
    }

    fn resolved_key(product_id: i64, config: &Configuration) -> String {
        format!("{}|{}", product_id, config.cache_key())
    }

    pub(crate) fn resolved(&self, product_id: i64, config: &Configuration) -> Option<ResolvedEntry> {
        let key = Self::resolved_key(product_id, config);
        let entry = self.resolved.get(&key)?;
        if self.is_fresh(entry.cached_at) {
            Some(entry.value().clone())
        } else {
            None
        }
    }

    pub(crate) fn put_resolved(
        &self,
        product_id: i64,
        config: &Configuration,
        image_url: Option<String>,
        code: Option<String>,
    ) {
        self.resolved.insert(
            Self::resolved_key(product_id, config),
            ResolvedEntry {
                image_url,
                code,
                cached_at: self.clock.now_millis(),
            },
        );
    }

    /// Resolved entry derived from a failed fetch; backdated like
    /// [`put_rows_error`](Self::put_rows_error) so it expires early.
    pub(crate) fn put_resolved_error(
        &self,
        product_id: i64,
        config: &Configuration,
        image_url: Option<String>,
        code: Option<String>,
    ) {
        self.resolved.insert(
            Self::resolved_key(product_id, config),
            ResolvedEntry {
                image_url,
                code,
                cached_at: self.clock.now_millis() - self.ttl_ms / 2,
            },
        );
    }

    /// Drop everything. Used on catalog reloads.
    pub fn clear(&self) {
        self.rows.clear();
        self.resolved.clear();
    }
}
