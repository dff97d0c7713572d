//! Client configuration

/// Configuration for connecting to the hosted platform.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Platform base URL (e.g. "https://xyz.example.co")
    pub base_url: String,

    /// Anonymous API key sent with every request
    pub api_key: String,

    /// Request timeout in seconds
    pub timeout: u64,
}

impl ClientConfig {
    /// Create a new client configuration.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: 30,
        }
    }

    /// Load from `PLATFORM_URL` / `PLATFORM_ANON_KEY` environment variables.
    pub fn from_env() -> Self {
        Self::new(
            std::env::var("PLATFORM_URL").unwrap_or_else(|_| "http://localhost:54321".into()),
            std::env::var("PLATFORM_ANON_KEY").unwrap_or_default(),
        )
    }

    /// Set the request timeout in seconds.
    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }
}
