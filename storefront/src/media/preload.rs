//! Fire-and-forget image warming.

use std::sync::Arc;

use tracing::debug;

/// Warms an image URL so it is hot by the time the UI asks for it.
/// Implementations must never block the caller and never fail loudly.
pub trait ImagePreloader: Send + Sync {
    fn preload(&self, url: &str);
}

/// Disabled preloading. Used in tests and headless runs.
#[derive(Debug, Default)]
pub struct NoopPreloader;

impl ImagePreloader for NoopPreloader {
    fn preload(&self, _url: &str) {}
}

/// Issues a background GET per URL. Responses are discarded; the point is
/// populating whatever HTTP cache sits between us and the CDN.
pub struct HttpPreloader {
    client: reqwest::Client,
}

impl HttpPreloader {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl ImagePreloader for HttpPreloader {
    fn preload(&self, url: &str) {
        let client = self.client.clone();
        let url = url.to_string();
        tokio::spawn(async move {
            if let Err(e) = client.get(&url).send().await {
                debug!("image preload failed for {url}: {e}");
            }
        });
    }
}

/// Records requested URLs instead of fetching them.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingPreloader {
    urls: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl RecordingPreloader {
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl ImagePreloader for RecordingPreloader {
    fn preload(&self, url: &str) {
        self.urls.lock().unwrap().push(url.to_string());
    }
}

/// Shared handle; preloaders carry no per-call state.
pub type SharedPreloader = Arc<dyn ImagePreloader>;
