//! API request and response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    duration::format_remaining,
    state::{Template, Timer, TimerId},
};

/// Timer as shown to a client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerView {
    pub id: TimerId,
    pub name: String,
    pub category: String,
    pub remaining_seconds: i64,
    pub remaining: String,
    pub progress: f64,
    pub is_repeating: bool,
    pub finished: bool,
    pub selectable: bool,
    pub selected: bool,
}

impl TimerView {
    pub fn new(timer: &Timer, selected: bool) -> Self {
        Self {
            id: timer.id,
            name: timer.name.clone(),
            category: timer.category.clone(),
            remaining_seconds: timer.remaining_seconds,
            remaining: format_remaining(timer.remaining_seconds),
            progress: timer.progress_ratio(),
            is_repeating: timer.is_repeating,
            finished: timer.is_finished(),
            selectable: !timer.is_finished(),
            selected,
        }
    }
}

/// API response structure for timer endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub timers: Vec<TimerView>,
    pub selected: Vec<TimerId>,
}

impl ApiResponse {
    /// Create a new API response
    pub fn new(status: &str, message: String, timers: Vec<TimerView>, selected: Vec<TimerId>) -> Self {
        Self {
            status: status.to_string(),
            message,
            timestamp: Utc::now(),
            timers,
            selected,
        }
    }

    pub fn ok(message: String, timers: Vec<TimerView>, selected: Vec<TimerId>) -> Self {
        Self::new("ok", message, timers, selected)
    }

    /// The action needs the user to confirm before anything happens
    pub fn confirm(message: String, timers: Vec<TimerView>, selected: Vec<TimerId>) -> Self {
        Self::new("confirm", message, timers, selected)
    }

    /// Create an error response
    pub fn error(message: String) -> Self {
        Self::new("error", message, Vec::new(), Vec::new())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplatesResponse {
    pub status: String,
    pub templates: Vec<Template>,
}

impl TemplatesResponse {
    pub fn ok(templates: Vec<Template>) -> Self {
        Self {
            status: "ok".to_string(),
            templates,
        }
    }
}

/// Status response with engine counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub active_timers: usize,
    pub finished_timers: usize,
    pub selected: usize,
    pub last_resync: u64,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTimerBody {
    pub name: String,
    pub duration: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub is_repeating: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTemplateBody {
    pub name: String,
    pub duration: String,
    #[serde(default)]
    pub category: Option<String>,
}

/// Signed minutes as typed, e.g. `+15` or `-10`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustBody {
    pub amount: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClearFinishedBody {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScreenshotQuery {
    #[serde(default)]
    pub filename: Option<String>,
}
