//! Engine assembly.

use std::sync::Arc;
use std::time::Duration;

use platform_client::PlatformApi;
use shared::Product;
use tracing::info;

use crate::cart::{CartStore, QuantityDebouncer};
use crate::configurator::Configurator;
use crate::core::EngineConfig;
use crate::hours::ServiceHoursGate;
use crate::kv::KvStore;
use crate::media::{MediaCache, MediaResolver, SharedPreloader};
use crate::onboarding::TourProgress;
use crate::orders::OrderService;
use crate::utils::{AppResult, Clock};

/// All engine subsystems wired together over one platform connection and
/// one local store.
pub struct Engine {
    pub cart: Arc<CartStore>,
    pub quantities: QuantityDebouncer,
    pub media: MediaResolver,
    pub hours: Arc<ServiceHoursGate>,
    pub orders: OrderService,
    pub tours: TourProgress,
    platform: Arc<dyn PlatformApi>,
}

impl Engine {
    pub fn new(
        config: &EngineConfig,
        platform: Arc<dyn PlatformApi>,
        kv: Arc<dyn KvStore>,
        clock: Arc<dyn Clock>,
        preloader: SharedPreloader,
    ) -> Self {
        let cart = Arc::new(CartStore::new(kv.clone()));
        let quantities = QuantityDebouncer::new(
            cart.clone(),
            Duration::from_millis(config.quantity_debounce_ms),
        );
        let media = MediaResolver::new(
            platform.clone(),
            MediaCache::new(config.media_cache_ttl_ms, clock.clone()),
            preloader,
        );
        let hours = Arc::new(ServiceHoursGate::new(
            platform.clone(),
            kv.clone(),
            clock,
            config.hours_cache_ttl_ms,
        ));
        let orders = OrderService::new(platform.clone(), cart.clone(), hours.clone());
        let tours = TourProgress::new(kv);
        Self {
            cart,
            quantities,
            media,
            hours,
            orders,
            tours,
            platform,
        }
    }

    /// Fetch the full catalog and drop any derived media state from a
    /// previous load.
    pub async fn load_catalog(&self) -> AppResult<Vec<Product>> {
        let products = self.platform.fetch_catalog().await?;
        self.media.cache().clear();
        info!("catalog loaded: {} products", products.len());
        Ok(products)
    }

    /// Selection-state machine for one product.
    pub fn configurator(&self, product: Arc<Product>) -> Configurator {
        Configurator::new(product)
    }
}
