//! Configuration-aware image and code resolution.

use std::sync::Arc;

use platform_client::PlatformApi;
use shared::{Configuration, MediaRow};
use tracing::warn;

use crate::media::cache::MediaCache;
use crate::media::preload::SharedPreloader;

/// Resolves the image and the orderable code for a (product, configuration)
/// pair, backed by the two-level cache.
///
/// Platform failures never surface to callers; the UI can always render a
/// fallback image and treat a missing code as "not available". Failures are
/// cached with a shortened lifetime so retries stay bounded.
pub struct MediaResolver {
    platform: Arc<dyn PlatformApi>,
    cache: MediaCache,
    preloader: SharedPreloader,
}

impl MediaResolver {
    pub fn new(platform: Arc<dyn PlatformApi>, cache: MediaCache, preloader: SharedPreloader) -> Self {
        Self {
            platform,
            cache,
            preloader,
        }
    }

    pub fn cache(&self) -> &MediaCache {
        &self.cache
    }

    /// Image for the given configuration.
    ///
    /// Fallback chain: exact configuration match, then the row flagged as
    /// default, then the first row, then the product's own default image,
    /// then `fallback_default`.
    pub async fn resolve_image(
        &self,
        product_id: i64,
        fallback_default: Option<&str>,
        config: &Configuration,
    ) -> Option<String> {
        let entry = self.resolve(product_id, config).await;
        let image = entry
            .image_url
            .or_else(|| fallback_default.map(str::to_string));
        if let Some(url) = &image {
            self.preloader.preload(url);
        }
        image
    }

    /// Orderable code for the given configuration. Exact match only; a
    /// configuration without its own row has no code, regardless of any
    /// default row.
    pub async fn resolve_code(&self, product_id: i64, config: &Configuration) -> Option<String> {
        self.resolve(product_id, config).await.code
    }

    async fn resolve(&self, product_id: i64, config: &Configuration) -> Resolved {
        if let Some(hit) = self.cache.resolved(product_id, config) {
            return Resolved {
                image_url: hit.image_url,
                code: hit.code,
            };
        }

        let fetched = self.ensure_rows(product_id).await;
        let rows = fetched.rows;
        let exact = rows.iter().find(|row| row.configuration.matches(config));
        let code = exact.and_then(|row| row.code.clone());
        let image_url = exact
            .and_then(|row| row.image_url.clone())
            .or_else(|| {
                rows.iter()
                    .find(|row| row.is_default)
                    .and_then(|row| row.image_url.clone())
            })
            .or_else(|| rows.first().and_then(|row| row.image_url.clone()))
            .or(fetched.default_image);

        if fetched.degraded {
            self.cache
                .put_resolved_error(product_id, config, image_url.clone(), code.clone());
        } else {
            self.cache
                .put_resolved(product_id, config, image_url.clone(), code.clone());
        }
        Resolved { image_url, code }
    }

    /// Rows for one product, fetching on miss. A product with no rows also
    /// gets its default image fetched, once per TTL window. `degraded` marks
    /// results shaped by a fetch failure, whether in this call or in the
    /// cached entry being served; derived entries then carry the shortened
    /// error lifetime too.
    async fn ensure_rows(&self, product_id: i64) -> FetchedRows {
        if let Some(entry) = self.cache.rows(product_id) {
            return FetchedRows {
                rows: entry.rows,
                default_image: entry.default_image,
                degraded: entry.degraded,
            };
        }

        match self.platform.fetch_media_rows(&[product_id]).await {
            Ok(rows) => self.cache.put_rows(product_id, rows),
            Err(e) => {
                warn!("media rows fetch failed for product {product_id}: {e}");
                self.cache.put_rows_error(product_id);
                return FetchedRows::degraded();
            }
        }

        let entry = match self.cache.rows(product_id) {
            Some(entry) => entry,
            None => return FetchedRows::degraded(),
        };
        if !entry.rows.is_empty() {
            return FetchedRows {
                rows: entry.rows,
                default_image: entry.default_image,
                degraded: entry.degraded,
            };
        }

        match self.platform.fetch_default_images(&[product_id]).await {
            Ok(mut images) => {
                let image = images.remove(&product_id);
                self.cache.put_default_image(product_id, image.clone());
                FetchedRows {
                    rows: entry.rows,
                    default_image: image,
                    degraded: false,
                }
            }
            Err(e) => {
                warn!("default image fetch failed for product {product_id}: {e}");
                // Downgrade the just-written rows entry; leaving it at the
                // full lifetime would pin the missing default image until it
                // expires, with no retry in between.
                self.cache.put_rows_error(product_id);
                FetchedRows::degraded()
            }
        }
    }

    /// Bulk-warm the cache for a page of products.
    ///
    /// Two bulk queries at most: one for media rows across every product
    /// that needs them (never-cached products ahead of merely stale ones),
    /// one for default images of products that turned out to have no rows.
    /// Each warmed product also gets its representative image preloaded.
    pub async fn prefetch(&self, product_ids: &[i64]) {
        let mut pending: Vec<i64> = Vec::new();
        let mut stale: Vec<i64> = Vec::new();
        for &id in product_ids {
            if self.cache.rows(id).is_some() {
                continue;
            }
            if self.cache.has_any_rows(id) {
                stale.push(id);
            } else {
                pending.push(id);
            }
        }
        pending.extend(stale);
        if pending.is_empty() {
            return;
        }

        let rows = match self.platform.fetch_media_rows(&pending).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("bulk media prefetch failed for {} products: {e}", pending.len());
                for id in pending {
                    self.cache.put_rows_error(id);
                }
                return;
            }
        };

        let mut by_product: std::collections::HashMap<i64, Vec<MediaRow>> =
            std::collections::HashMap::new();
        for row in rows {
            by_product.entry(row.product_id).or_default().push(row);
        }
        let mut without_rows: Vec<i64> = Vec::new();
        for id in &pending {
            let rows = by_product.remove(id).unwrap_or_default();
            if rows.is_empty() {
                without_rows.push(*id);
            }
            self.cache.put_rows(*id, rows);
        }

        if !without_rows.is_empty() {
            match self.platform.fetch_default_images(&without_rows).await {
                Ok(images) => {
                    for id in &without_rows {
                        self.cache.put_default_image(*id, images.get(id).cloned());
                    }
                }
                Err(e) => {
                    warn!("bulk default image fetch failed: {e}");
                    for id in &without_rows {
                        self.cache.put_rows_error(*id);
                    }
                }
            }
        }

        for id in pending {
            let Some(entry) = self.cache.rows(id) else {
                continue;
            };
            for row in entry.rows.iter() {
                if let Some(url) = &row.image_url {
                    self.preloader.preload(url);
                }
            }
            if entry.rows.is_empty() {
                if let Some(url) = &entry.default_image {
                    self.preloader.preload(url);
                }
            }
        }
    }
}

struct Resolved {
    image_url: Option<String>,
    code: Option<String>,
}

struct FetchedRows {
    rows: Arc<Vec<MediaRow>>,
    default_image: Option<String>,
    degraded: bool,
}

impl FetchedRows {
    fn degraded() -> Self {
        Self {
            rows: Arc::new(Vec::new()),
            default_image: None,
            degraded: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::preload::RecordingPreloader;
    use crate::utils::FakeClock;
    use platform_client::MemoryPlatform;

    const TTL: i64 = 10_000;

    fn row(id: i64, product_id: i64, entries: &[(&str, &str)], image: Option<&str>, code: Option<&str>, is_default: bool) -> MediaRow {
        MediaRow {
            id,
            product_id,
            configuration: entries.iter().copied().collect(),
            image_url: image.map(str::to_string),
            code: code.map(str::to_string),
            is_default,
        }
    }

    fn bare_product(id: i64, default_image: &str) -> shared::Product {
        shared::Product {
            id,
            name: format!("product {id}"),
            description: String::new(),
            default_image: default_image.to_string(),
            attributes: Vec::new(),
            values: Vec::new(),
            combinations: Vec::new(),
        }
    }

    struct Fixture {
        platform: Arc<MemoryPlatform>,
        resolver: MediaResolver,
        clock: Arc<FakeClock>,
        preloader: Arc<RecordingPreloader>,
    }

    fn fixture(rows: Vec<MediaRow>) -> Fixture {
        fixture_with_products(rows, Vec::new())
    }

    fn fixture_with_products(rows: Vec<MediaRow>, products: Vec<shared::Product>) -> Fixture {
        let platform = Arc::new(
            MemoryPlatform::new()
                .with_media_rows(rows)
                .with_products(products),
        );
        let clock = Arc::new(FakeClock::new(1_000_000));
        let preloader = Arc::new(RecordingPreloader::default());
        let resolver = MediaResolver::new(
            platform.clone(),
            MediaCache::new(TTL, clock.clone()),
            preloader.clone(),
        );
        Fixture {
            platform,
            resolver,
            clock,
            preloader,
        }
    }

    fn bufala_250() -> Configuration {
        [("tipologia", "bufala"), ("formato", "250g")]
            .into_iter()
            .collect()
    }

    #[tokio::test]
    async fn test_exact_match_wins() {
        let f = fixture(vec![
            row(1, 7, &[("tipologia", "bufala"), ("formato", "250g")], Some("bufala250.jpg"), Some("MB250"), false),
            row(2, 7, &[], Some("default.jpg"), None, true),
        ]);
        let image = f.resolver.resolve_image(7, Some("product.jpg"), &bufala_250()).await;
        assert_eq!(image.as_deref(), Some("bufala250.jpg"));
        assert_eq!(
            f.resolver.resolve_code(7, &bufala_250()).await.as_deref(),
            Some("MB250")
        );
        assert_eq!(f.preloader.urls(), vec!["bufala250.jpg"]);
    }

    #[tokio::test]
    async fn test_fallback_chain_default_row_then_first_then_product() {
        let f = fixture(vec![
            row(1, 7, &[("tipologia", "fior di latte")], Some("fdl.jpg"), None, false),
            row(2, 7, &[("tipologia", "affumicata")], Some("fumo.jpg"), None, true),
        ]);
        // No exact match: default-flagged row wins over the first row.
        let image = f.resolver.resolve_image(7, Some("product.jpg"), &bufala_250()).await;
        assert_eq!(image.as_deref(), Some("fumo.jpg"));

        // No rows at all: platform default image, then the caller fallback.
        let g = fixture(Vec::new());
        let image = g.resolver.resolve_image(9, Some("product.jpg"), &bufala_250()).await;
        assert_eq!(image.as_deref(), Some("product.jpg"));
    }

    #[tokio::test]
    async fn test_code_has_no_fallback() {
        let f = fixture(vec![row(1, 7, &[], Some("d.jpg"), Some("DEF"), true)]);
        assert_eq!(f.resolver.resolve_code(7, &bufala_250()).await, None);
    }

    #[tokio::test]
    async fn test_second_lookup_served_from_cache() {
        let f = fixture(vec![row(
            1,
            7,
            &[("tipologia", "bufala"), ("formato", "250g")],
            Some("b.jpg"),
            None,
            false,
        )]);
        f.resolver.resolve_image(7, None, &bufala_250()).await;
        f.resolver.resolve_image(7, None, &bufala_250()).await;
        assert_eq!(f.platform.media_fetch_count(), 1);

        // A different configuration reuses the cached rows.
        let other: Configuration = [("tipologia", "fior di latte")].into_iter().collect();
        f.resolver.resolve_image(7, None, &other).await;
        assert_eq!(f.platform.media_fetch_count(), 1);

        f.clock.advance(TTL);
        f.resolver.resolve_image(7, None, &bufala_250()).await;
        assert_eq!(f.platform.media_fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_failure_cached_with_half_ttl() {
        let f = fixture(Vec::new());
        f.platform.fail_media_rows(true);
        let image = f.resolver.resolve_image(7, Some("fallback.jpg"), &bufala_250()).await;
        assert_eq!(image.as_deref(), Some("fallback.jpg"));
        assert_eq!(f.platform.media_fetch_count(), 1);

        // Still inside the shortened window: no retry.
        f.clock.advance(TTL / 2 - 1);
        f.resolver.resolve_image(7, Some("fallback.jpg"), &bufala_250()).await;
        assert_eq!(f.platform.media_fetch_count(), 1);

        // Past it: the failure entry has expired and we retry.
        f.platform.fail_media_rows(false);
        f.clock.advance(1);
        f.resolver.resolve_image(7, Some("fallback.jpg"), &bufala_250()).await;
        assert_eq!(f.platform.media_fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_prefetch_is_two_bulk_calls() {
        let f = fixture_with_products(
            vec![
                row(1, 1, &[("tipologia", "bufala")], Some("one.jpg"), None, true),
                row(2, 2, &[("tipologia", "bufala")], Some("two.jpg"), None, false),
            ],
            vec![bare_product(3, "three.jpg")],
        );

        f.resolver.prefetch(&[1, 2, 3]).await;
        assert_eq!(f.platform.media_fetch_count(), 1);
        assert_eq!(f.platform.default_image_fetch_count(), 1);

        let mut warmed = f.preloader.urls();
        warmed.sort();
        assert_eq!(warmed, vec!["one.jpg", "three.jpg", "two.jpg"]);

        // Everything fresh: a second prefetch is a no-op.
        f.resolver.prefetch(&[1, 2, 3]).await;
        assert_eq!(f.platform.media_fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_default_image_failure_retried_after_error_ttl() {
        let f = fixture_with_products(Vec::new(), vec![bare_product(9, "nine.jpg")]);
        f.platform.fail_default_images(true);
        let image = f.resolver.resolve_image(9, Some("fallback.jpg"), &bufala_250()).await;
        assert_eq!(image.as_deref(), Some("fallback.jpg"));
        assert_eq!(f.platform.default_image_fetch_count(), 1);

        // Still inside the shortened window: served from cache, no retry.
        f.platform.fail_default_images(false);
        f.clock.advance(TTL / 2 - 1);
        let image = f.resolver.resolve_image(9, Some("fallback.jpg"), &bufala_250()).await;
        assert_eq!(image.as_deref(), Some("fallback.jpg"));
        assert_eq!(f.platform.default_image_fetch_count(), 1);

        // Past it both cache levels have expired and the default image
        // comes back instead of sticking at the caller fallback.
        f.clock.advance(1);
        let image = f.resolver.resolve_image(9, Some("fallback.jpg"), &bufala_250()).await;
        assert_eq!(image.as_deref(), Some("nine.jpg"));
        assert_eq!(f.platform.default_image_fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_prefetch_default_image_failure_expires_early() {
        let f = fixture_with_products(Vec::new(), vec![bare_product(3, "three.jpg")]);
        f.platform.fail_default_images(true);
        f.resolver.prefetch(&[3]).await;
        assert_eq!(f.platform.default_image_fetch_count(), 1);

        // The degraded entry suppresses refetching until its early expiry.
        f.platform.fail_default_images(false);
        f.clock.advance(TTL / 2 - 1);
        f.resolver.prefetch(&[3]).await;
        assert_eq!(f.platform.media_fetch_count(), 1);

        f.clock.advance(1);
        f.resolver.prefetch(&[3]).await;
        assert_eq!(f.platform.media_fetch_count(), 2);
        assert_eq!(f.platform.default_image_fetch_count(), 2);
        let image = f.resolver.resolve_image(3, None, &bufala_250()).await;
        assert_eq!(image.as_deref(), Some("three.jpg"));
    }

    #[tokio::test]
    async fn test_prefetch_skips_fresh_products() {
        let f = fixture(vec![
            row(1, 1, &[("a", "x")], Some("one.jpg"), None, false),
            row(2, 2, &[("a", "x")], Some("two.jpg"), None, false),
        ]);
        f.resolver.resolve_image(1, None, &bufala_250()).await;
        assert_eq!(f.platform.media_fetch_count(), 1);

        f.resolver.prefetch(&[1, 2]).await;
        assert_eq!(f.platform.media_fetch_count(), 2);
        assert_eq!(f.platform.last_media_request(), vec![2]);
    }
}
