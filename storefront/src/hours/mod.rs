//! Service-hours gate.
//!
//! Orders are only accepted inside the published service window and while
//! the user's daily quota has headroom. The window is cached locally with a
//! long TTL and served stale while a background refresh runs; the gate must
//! answer instantly on every checkout render.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{Datelike, Timelike};
use platform_client::PlatformApi;
use serde::{Deserialize, Serialize};
use shared::ServiceWindow;
use tracing::{debug, warn};

use crate::kv::{KvStore, KvStoreExt};
use crate::utils::Clock;

const WINDOW_KEY: &str = "service_window";

#[derive(Debug, Serialize, Deserialize)]
struct CachedWindow {
    window: ServiceWindow,
    fetched_at: i64,
}

/// Why the gate refused an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosedReason {
    OutsideHours,
    NotAnOrderDay,
    QuotaExhausted,
    QuotaUnavailable,
}

impl fmt::Display for ClosedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::OutsideHours => "ordering is closed at this hour",
            Self::NotAnOrderDay => "today is not an ordering day",
            Self::QuotaExhausted => "daily order limit reached",
            Self::QuotaUnavailable => "order availability could not be verified",
        };
        f.write_str(message)
    }
}

/// Gate verdict for one checkout attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStatus {
    Open,
    Closed(ClosedReason),
}

impl GateStatus {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

/// Service window and quota checks, cached and failure-tolerant.
pub struct ServiceHoursGate {
    platform: Arc<dyn PlatformApi>,
    kv: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    ttl_ms: i64,
    refreshing: Arc<AtomicBool>,
}

impl ServiceHoursGate {
    pub fn new(
        platform: Arc<dyn PlatformApi>,
        kv: Arc<dyn KvStore>,
        clock: Arc<dyn Clock>,
        ttl_ms: i64,
    ) -> Self {
        Self {
            platform,
            kv,
            clock,
            ttl_ms,
            refreshing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The current service window. Never fails: a fresh cached window is
    /// returned directly, a stale one is returned while a background
    /// refresh runs, and with nothing cached the platform is asked inline,
    /// falling back to the default window on error.
    pub async fn service_window(&self) -> ServiceWindow {
        let cached: Option<CachedWindow> = self.kv.get_json(WINDOW_KEY).unwrap_or_default();
        match cached {
            Some(cached) if self.clock.now_millis() - cached.fetched_at < self.ttl_ms => {
                cached.window
            }
            Some(cached) => {
                self.spawn_refresh();
                cached.window
            }
            None => match self.platform.fetch_service_window().await {
                Ok(window) => {
                    self.store_window(&window);
                    window
                }
                Err(e) => {
                    warn!("service window fetch failed, using defaults: {e}");
                    ServiceWindow::default()
                }
            },
        }
    }

    fn store_window(&self, window: &ServiceWindow) {
        let cached = CachedWindow {
            window: window.clone(),
            fetched_at: self.clock.now_millis(),
        };
        if let Err(e) = self.kv.set_json(WINDOW_KEY, &cached) {
            warn!("failed to cache service window: {e}");
        }
    }

    fn spawn_refresh(&self) {
        if self.refreshing.swap(true, Ordering::SeqCst) {
            return;
        }
        let platform = self.platform.clone();
        let kv = self.kv.clone();
        let clock = self.clock.clone();
        let refreshing = self.refreshing.clone();
        tokio::spawn(async move {
            match platform.fetch_service_window().await {
                Ok(window) => {
                    let cached = CachedWindow {
                        window,
                        fetched_at: clock.now_millis(),
                    };
                    if let Err(e) = kv.set_json(WINDOW_KEY, &cached) {
                        warn!("failed to cache refreshed service window: {e}");
                    }
                }
                // Stale data stays in place and the next stale hit retries.
                Err(e) => debug!("background service window refresh failed: {e}"),
            }
            refreshing.store(false, Ordering::SeqCst);
        });
    }

    /// Whether the service window is open right now.
    pub async fn is_open_now(&self) -> bool {
        let window = self.service_window().await;
        let now = self.clock.now();
        let time = chrono::NaiveTime::from_hms_opt(now.hour(), now.minute(), 0)
            .unwrap_or(chrono::NaiveTime::MIN);
        window.is_open(now.weekday(), time)
    }

    /// Full checkout gate: window first, then the user's daily quota.
    /// A quota lookup failure closes the gate; an order must not slip
    /// through unverified.
    pub async fn order_gate(&self, user_id: &str) -> GateStatus {
        if !self.is_open_now().await {
            return GateStatus::Closed(ClosedReason::OutsideHours);
        }
        let quota = match self.platform.daily_quota(user_id).await {
            Ok(quota) => quota,
            Err(e) => {
                warn!("daily quota lookup failed for {user_id}: {e}");
                return GateStatus::Closed(ClosedReason::QuotaUnavailable);
            }
        };
        if !quota.is_order_day {
            return GateStatus::Closed(ClosedReason::NotAnOrderDay);
        }
        if quota.remaining() == 0 {
            return GateStatus::Closed(ClosedReason::QuotaExhausted);
        }
        GateStatus::Open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKvStore;
    use crate::utils::FakeClock;
    use chrono::TimeZone;
    use platform_client::MemoryPlatform;
    use shared::DailyQuota;

    const TTL: i64 = 6 * 60 * 60 * 1000;

    /// Tuesday 12:00 UTC.
    fn noon_millis() -> i64 {
        chrono::Utc
            .with_ymd_and_hms(2026, 8, 25, 12, 0, 0)
            .unwrap()
            .timestamp_millis()
    }

    struct Fixture {
        platform: Arc<MemoryPlatform>,
        clock: Arc<FakeClock>,
        gate: ServiceHoursGate,
    }

    fn fixture(platform: MemoryPlatform) -> Fixture {
        let platform = Arc::new(platform);
        let clock = Arc::new(FakeClock::new(noon_millis()));
        let gate = ServiceHoursGate::new(
            platform.clone(),
            Arc::new(MemoryKvStore::new()),
            clock.clone(),
            TTL,
        );
        Fixture {
            platform,
            clock,
            gate,
        }
    }

    #[tokio::test]
    async fn test_window_cached_across_calls() {
        let f = fixture(MemoryPlatform::new());
        f.gate.service_window().await;
        f.gate.service_window().await;
        assert_eq!(f.platform.window_fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_stale_window_served_while_refreshing() {
        let f = fixture(MemoryPlatform::new().with_service_window(ServiceWindow {
            opens_at: "06:00".into(),
            ..Default::default()
        }));
        let first = f.gate.service_window().await;
        assert_eq!(first.opens_at, "06:00");

        f.clock.advance(TTL + 1);
        let stale = f.gate.service_window().await;
        assert_eq!(stale.opens_at, "06:00");

        // Let the background refresh land, then verify the cache moved on.
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert_eq!(f.platform.window_fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_degrades_to_defaults() {
        let f = fixture(MemoryPlatform::new());
        f.platform.fail_service_window(true);
        let window = f.gate.service_window().await;
        assert_eq!(window, ServiceWindow::default());

        // Failure is not cached; recovery is picked up on the next call.
        f.platform.fail_service_window(false);
        let window = f.gate.service_window().await;
        assert_eq!(window, ServiceWindow::default());
        assert_eq!(f.platform.window_fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_open_now_respects_window_bounds() {
        let f = fixture(MemoryPlatform::new());
        assert!(f.gate.is_open_now().await);

        // 22:30, past the default close.
        f.clock.advance(10 * 60 * 60 * 1000 + 30 * 60 * 1000);
        assert!(!f.gate.is_open_now().await);
    }

    #[tokio::test]
    async fn test_excluded_day_closes_gate() {
        let f = fixture(MemoryPlatform::new().with_service_window(ServiceWindow {
            excluded_days: vec!["tuesday".into()],
            ..Default::default()
        }));
        assert!(!f.gate.is_open_now().await);
        assert_eq!(
            f.gate.order_gate("anna").await,
            GateStatus::Closed(ClosedReason::OutsideHours)
        );
    }

    #[tokio::test]
    async fn test_order_gate_quota_branches() {
        let f = fixture(MemoryPlatform::new().with_quota(DailyQuota {
            is_order_day: true,
            orders_placed_today: 0,
            daily_maximum: 3,
        }));
        assert_eq!(f.gate.order_gate("anna").await, GateStatus::Open);

        f.platform.set_quota(DailyQuota {
            is_order_day: true,
            orders_placed_today: 3,
            daily_maximum: 3,
        });
        assert_eq!(
            f.gate.order_gate("anna").await,
            GateStatus::Closed(ClosedReason::QuotaExhausted)
        );

        f.platform.set_quota(DailyQuota {
            is_order_day: false,
            orders_placed_today: 0,
            daily_maximum: 3,
        });
        assert_eq!(
            f.gate.order_gate("anna").await,
            GateStatus::Closed(ClosedReason::NotAnOrderDay)
        );
    }

    #[tokio::test]
    async fn test_quota_lookup_failure_closes_gate() {
        // No quota configured: the lookup errors.
        let f = fixture(MemoryPlatform::new());
        assert_eq!(
            f.gate.order_gate("anna").await,
            GateStatus::Closed(ClosedReason::QuotaUnavailable)
        );
    }
}
