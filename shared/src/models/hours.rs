//! Service window and daily quota.

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// Ordering hours published by the platform. Cached locally with a 6-hour
/// freshness window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceWindow {
    /// "HH:MM", inclusive start of the ordering window.
    pub opens_at: String,
    /// "HH:MM", exclusive end of the ordering window.
    pub closes_at: String,
    /// Weekdays on which ordering is disabled ("monday", "sunday", ...).
    pub excluded_days: Vec<String>,
}

impl Default for ServiceWindow {
    fn default() -> Self {
        Self {
            opens_at: "05:00".to_string(),
            closes_at: "21:00".to_string(),
            excluded_days: Vec::new(),
        }
    }
}

impl ServiceWindow {
    /// Whether ordering is open at the given local time/weekday. Malformed
    /// bounds fall back to the defaults rather than rejecting orders.
    pub fn is_open(&self, weekday: Weekday, time: NaiveTime) -> bool {
        let day = format!("{:?}", weekday).to_lowercase();
        if self.excluded_days.iter().any(|d| d.to_lowercase() == day) {
            return false;
        }
        let defaults = ServiceWindow::default();
        let opens = parse_hhmm(&self.opens_at)
            .or_else(|| parse_hhmm(&defaults.opens_at))
            .unwrap_or(NaiveTime::MIN);
        let closes = parse_hhmm(&self.closes_at)
            .or_else(|| parse_hhmm(&defaults.closes_at))
            .unwrap_or(NaiveTime::MIN);
        time >= opens && time < closes
    }
}

fn parse_hhmm(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M").ok()
}

/// Result of the platform's daily-quota remote procedure for one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyQuota {
    /// Whether "today" is a valid ordering day for this user.
    pub is_order_day: bool,
    pub orders_placed_today: u32,
    pub daily_maximum: u32,
}

impl DailyQuota {
    pub fn remaining(&self) -> u32 {
        self.daily_maximum.saturating_sub(self.orders_placed_today)
    }
}
