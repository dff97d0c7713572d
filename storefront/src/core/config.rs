//! Engine configuration - tunables for caching, debouncing and quantities.
//!
//! # Environment variables
//!
//! All values can be overridden through environment variables:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | MEDIA_CACHE_TTL_MS | 300000 | Derived-data cache TTL (5 min) |
//! | HOURS_CACHE_TTL_MS | 21600000 | Service-window cache TTL (6 h) |
//! | QUANTITY_DEBOUNCE_MS | 600 | Increment coalescing window |
//! | LOG_LEVEL | info | Default tracing level |

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Derived-data cache TTL in milliseconds; error entries use half.
    pub media_cache_ttl_ms: i64,
    /// Service-window cache freshness window in milliseconds.
    pub hours_cache_ttl_ms: i64,
    /// Quantity-stepper increment coalescing window in milliseconds.
    pub quantity_debounce_ms: u64,
    /// Default tracing level.
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            media_cache_ttl_ms: 5 * 60 * 1000,
            hours_cache_ttl_ms: 6 * 60 * 60 * 1000,
            quantity_debounce_ms: 600,
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            media_cache_ttl_ms: env_parse("MEDIA_CACHE_TTL_MS", defaults.media_cache_ttl_ms),
            hours_cache_ttl_ms: env_parse("HOURS_CACHE_TTL_MS", defaults.hours_cache_ttl_ms),
            quantity_debounce_ms: env_parse(
                "QUANTITY_DEBOUNCE_MS",
                defaults.quantity_debounce_ms,
            ),
            log_level: std::env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
