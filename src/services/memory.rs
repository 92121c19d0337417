//! Process-local backend
//!
//! Keeps end times rather than counters, reports remaining seconds clamped
//! at zero in end-time order, and regenerates expired repeating timers with
//! the duration they were created with. Used for offline runs and tests.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use super::backend::{AdjustRequest, NewTemplate, NewTimer, TimerBackend};
use crate::{
    clock::Clock,
    duration::{self, CanonicalDuration},
    error::BackendError,
    state::{Template, TemplateId, TimerId, TimerRecord, DEFAULT_CATEGORY},
};

#[derive(Debug, Clone)]
struct StoredTimer {
    id: TimerId,
    name: String,
    category: String,
    duration: CanonicalDuration,
    end_time: DateTime<Utc>,
    is_repeating: bool,
    cleared: bool,
    regenerated: bool,
}

#[derive(Debug, Default)]
struct Store {
    timers: Vec<StoredTimer>,
    templates: Vec<Template>,
    next_timer_id: TimerId,
    next_template_id: TemplateId,
    failing_ids: HashSet<TimerId>,
    offline: bool,
}

#[derive(Debug)]
pub struct InMemoryBackend {
    clock: Arc<dyn Clock>,
    regeneration_delay: Duration,
    store: Mutex<Store>,
}

fn not_found(what: &str, id: i64) -> BackendError {
    BackendError::Status {
        status: 404,
        detail: format!("{} {} not found", what, id),
    }
}

fn bad_request(detail: &str) -> BackendError {
    BackendError::Status {
        status: 400,
        detail: detail.to_string(),
    }
}

impl InMemoryBackend {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            regeneration_delay: Duration::zero(),
            store: Mutex::new(Store {
                next_timer_id: 1,
                next_template_id: 1,
                ..Store::default()
            }),
        }
    }

    /// Wait this long past expiry before creating the next repeat
    pub fn with_regeneration_delay(mut self, delay: Duration) -> Self {
        self.regeneration_delay = delay;
        self
    }

    /// Make every call fail as if the network were down
    pub fn set_offline(&self, offline: bool) {
        if let Ok(mut store) = self.store.lock() {
            store.offline = offline;
        }
    }

    /// Make delete and clear calls for this timer fail
    pub fn fail_timer(&self, id: TimerId) {
        if let Ok(mut store) = self.store.lock() {
            store.failing_ids.insert(id);
        }
    }

    /// Ids still stored, cleared ones included
    pub fn stored_ids(&self) -> Vec<TimerId> {
        self.store
            .lock()
            .map(|store| store.timers.iter().map(|t| t.id).collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Store>, BackendError> {
        let store = self
            .store
            .lock()
            .map_err(|e| BackendError::Transport(format!("store unavailable: {}", e)))?;
        if store.offline {
            return Err(BackendError::Transport("connection refused".to_string()));
        }
        Ok(store)
    }

    fn regenerate_expired(&self, store: &mut Store, now: DateTime<Utc>) {
        let due: Vec<usize> = store
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| {
                t.is_repeating
                    && !t.regenerated
                    && !t.cleared
                    && now >= t.end_time + self.regeneration_delay
            })
            .map(|(index, _)| index)
            .collect();

        for index in due {
            let id = store.next_timer_id;
            store.next_timer_id += 1;
            let previous = &mut store.timers[index];
            previous.regenerated = true;
            let next = StoredTimer {
                id,
                name: previous.name.clone(),
                category: previous.category.clone(),
                duration: previous.duration,
                end_time: now + seconds(previous.duration),
                is_repeating: true,
                cleared: false,
                regenerated: false,
            };
            info!("Regenerated repeating timer '{}' as {}", next.name, id);
            store.timers.push(next);
        }
    }
}

/// Longest duration stored, keeps end times representable
const MAX_DURATION_SECS: i64 = 100 * 365 * 86_400;

fn seconds(duration: CanonicalDuration) -> Duration {
    let secs = i64::try_from(duration.total_seconds()).unwrap_or(MAX_DURATION_SECS);
    Duration::seconds(secs.min(MAX_DURATION_SECS))
}

fn to_record(timer: &StoredTimer, now: DateTime<Utc>) -> TimerRecord {
    TimerRecord {
        id: timer.id,
        name: timer.name.clone(),
        category: timer.category.clone(),
        remaining_seconds: (timer.end_time - now).num_seconds().max(0),
        is_repeating: timer.is_repeating,
    }
}

#[async_trait]
impl TimerBackend for InMemoryBackend {
    async fn list_timers(&self) -> Result<Vec<TimerRecord>, BackendError> {
        let now = self.clock.now();
        let mut store = self.lock()?;
        self.regenerate_expired(&mut store, now);

        let mut visible: Vec<&StoredTimer> = store.timers.iter().filter(|t| !t.cleared).collect();
        visible.sort_by_key(|t| (t.end_time, t.id));
        Ok(visible.into_iter().map(|t| to_record(t, now)).collect())
    }

    async fn create_timer(&self, timer: &NewTimer) -> Result<Option<TimerRecord>, BackendError> {
        if timer.name.trim().is_empty() {
            return Err(bad_request("Timer name must not be empty"));
        }
        let now = self.clock.now();
        let duration = duration::parse(&timer.duration);
        let mut store = self.lock()?;
        let id = store.next_timer_id;
        store.next_timer_id += 1;
        let stored = StoredTimer {
            id,
            name: timer.name.trim().to_string(),
            category: timer
                .category
                .clone()
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            duration,
            end_time: now + seconds(duration),
            is_repeating: timer.is_repeating,
            cleared: false,
            regenerated: false,
        };
        let record = to_record(&stored, now);
        store.timers.push(stored);
        debug!("Stored timer {} ending in {}s", id, record.remaining_seconds);
        Ok(Some(record))
    }

    async fn delete_timer(&self, id: TimerId) -> Result<(), BackendError> {
        let mut store = self.lock()?;
        if store.failing_ids.contains(&id) {
            return Err(BackendError::Transport(format!("delete of {} timed out", id)));
        }
        let before = store.timers.len();
        store.timers.retain(|t| t.id != id);
        if store.timers.len() == before {
            return Err(not_found("Timer", id));
        }
        Ok(())
    }

    async fn clear_timer(&self, id: TimerId) -> Result<(), BackendError> {
        let mut store = self.lock()?;
        if store.failing_ids.contains(&id) {
            return Err(BackendError::Transport(format!("clear of {} timed out", id)));
        }
        let timer = store
            .timers
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| not_found("Timer", id))?;
        timer.cleared = true;
        Ok(())
    }

    async fn adjust_time(&self, request: &AdjustRequest) -> Result<(), BackendError> {
        let mut store = self.lock()?;
        if let Some(missing) = request
            .timer_ids
            .iter()
            .find(|id| !store.timers.iter().any(|t| t.id == **id))
        {
            return Err(not_found("Timer", *missing));
        }
        let delta = Duration::try_minutes(request.minutes)
            .ok_or_else(|| bad_request("Adjustment is out of range"))?;
        let mut adjusted = Vec::with_capacity(request.timer_ids.len());
        for timer in store.timers.iter().filter(|t| request.timer_ids.contains(&t.id)) {
            let end_time = timer
                .end_time
                .checked_add_signed(delta)
                .ok_or_else(|| bad_request("Adjustment is out of range"))?;
            adjusted.push((timer.id, end_time));
        }
        for (id, end_time) in adjusted {
            if let Some(timer) = store.timers.iter_mut().find(|t| t.id == id) {
                timer.end_time = end_time;
            }
        }
        info!("Adjusted {} timers by {} minutes", request.timer_ids.len(), request.minutes);
        Ok(())
    }

    async fn list_templates(&self) -> Result<Vec<Template>, BackendError> {
        Ok(self.lock()?.templates.clone())
    }

    async fn create_template(
        &self,
        template: &NewTemplate,
    ) -> Result<Option<Template>, BackendError> {
        if template.name.trim().is_empty() || template.duration.trim().is_empty() {
            return Err(bad_request("Template name and duration are required"));
        }
        let mut store = self.lock()?;
        let id = store.next_template_id;
        store.next_template_id += 1;
        let created = Template {
            id,
            name: template.name.trim().to_string(),
            duration: template.duration.clone(),
            category: template
                .category
                .clone()
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        };
        store.templates.push(created.clone());
        Ok(Some(created))
    }

    async fn delete_template(&self, id: TemplateId) -> Result<(), BackendError> {
        let mut store = self.lock()?;
        let before = store.templates.len();
        store.templates.retain(|t| t.id != id);
        if store.templates.len() == before {
            return Err(not_found("Template", id));
        }
        Ok(())
    }

    async fn upload_screenshot(
        &self,
        _filename: &str,
        _bytes: Vec<u8>,
    ) -> Result<(), BackendError> {
        drop(self.lock()?);
        Err(BackendError::Unsupported("screenshot ingestion"))
    }
}
