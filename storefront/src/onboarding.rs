//! First-run tour flags.
//!
//! Each named tour is shown once per identity. Seen-state is a small flag
//! in the local store under `tour_<name>_<identity>`.

use std::sync::Arc;

use crate::kv::KvStore;
use crate::utils::AppResult;

pub struct TourProgress {
    kv: Arc<dyn KvStore>,
}

impl TourProgress {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    fn key(tour: &str, user_id: Option<&str>) -> String {
        format!("tour_{}_{}", tour, user_id.unwrap_or("guest"))
    }

    pub fn seen(&self, tour: &str, user_id: Option<&str>) -> AppResult<bool> {
        Ok(self.kv.get(&Self::key(tour, user_id))?.is_some())
    }

    pub fn mark_seen(&self, tour: &str, user_id: Option<&str>) -> AppResult<()> {
        self.kv.set(&Self::key(tour, user_id), "1")
    }

    /// Forget a tour so it plays again. Used by the "replay tutorial" menu
    /// entry.
    pub fn reset(&self, tour: &str, user_id: Option<&str>) -> AppResult<()> {
        self.kv.remove(&Self::key(tour, user_id))
    }
}
