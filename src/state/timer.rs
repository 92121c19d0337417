//! Timer and template records

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub type TimerId = i64;
pub type TemplateId = i64;

pub const DEFAULT_CATEGORY: &str = "General";

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// Instant at which `remaining` seconds from `now` run out
fn anchor_at(now: DateTime<Utc>, remaining: i64) -> DateTime<Utc> {
    Duration::try_seconds(remaining)
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Timer as reported by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerRecord {
    pub id: TimerId,
    pub name: String,
    #[serde(default = "default_category")]
    pub category: String,
    pub remaining_seconds: i64,
    #[serde(default)]
    pub is_repeating: bool,
}

/// Timer tracked on this client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Timer {
    pub id: TimerId,
    pub name: String,
    pub category: String,
    /// Projection of `anchor_end_time - now`, never negative
    pub remaining_seconds: i64,
    /// Captured at first observation, only used for progress
    pub total_seconds: i64,
    pub is_repeating: bool,
    pub anchor_end_time: DateTime<Utc>,
}

impl Timer {
    /// Start tracking a record first observed at `now`
    pub fn observe(record: TimerRecord, now: DateTime<Utc>) -> Self {
        let remaining = record.remaining_seconds.max(0);
        Self {
            id: record.id,
            name: record.name,
            category: record.category,
            remaining_seconds: remaining,
            total_seconds: remaining.max(1),
            is_repeating: record.is_repeating,
            anchor_end_time: anchor_at(now, remaining),
        }
    }

    /// Take fresh authoritative values, keeping the captured total.
    /// Returns true when anything visible changed.
    pub fn reanchor(&mut self, record: TimerRecord, now: DateTime<Utc>) -> bool {
        let remaining = record.remaining_seconds.max(0);
        let changed = self.name != record.name
            || self.category != record.category
            || self.remaining_seconds != remaining
            || self.is_repeating != record.is_repeating;
        self.name = record.name;
        self.category = record.category;
        self.is_repeating = record.is_repeating;
        self.remaining_seconds = remaining;
        self.anchor_end_time = anchor_at(now, remaining);
        changed
    }

    pub fn is_finished(&self) -> bool {
        self.remaining_seconds <= 0
    }

    /// Fraction of the captured total still remaining, in `0.0..=1.0`
    pub fn progress_ratio(&self) -> f64 {
        (self.remaining_seconds as f64 / self.total_seconds as f64).clamp(0.0, 1.0)
    }
}

/// Reusable timer preset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    /// Canonical duration string, e.g. `0d1h30m`
    pub duration: String,
    #[serde(default = "default_category")]
    pub category: String,
}
