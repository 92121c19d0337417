//! Main application state management

use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard},
    time::Instant,
};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::{broadcast, Notify};
use tracing::{debug, info, warn};

use super::{DismissedStore, Template, TemplateId, Timer, TimerId, TimerRecord};
use crate::{
    clock::Clock,
    config::RemovalMode,
    duration::{self, parse_adjustment_minutes},
    engine::{EngineEvent, ResyncOutcome, TickReport, TimerEngine},
    error::{BackendError, EngineError, ValidationError},
    services::{AdjustRequest, NewTemplate, NewTimer, TimerBackend},
};

/// User input for a new timer
#[derive(Debug, Clone, Default)]
pub struct TimerRequest {
    pub name: String,
    /// Raw text from the duration field
    pub duration: String,
    pub category: Option<String>,
    pub is_repeating: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdjustOutcome {
    /// Selection was empty, nothing was sent
    NothingSelected,
    Adjusted { timers: usize, minutes: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearOutcome {
    NothingFinished,
    NeedsConfirmation { count: usize },
    Cleared {
        cleared: Vec<TimerId>,
        failed: Vec<(TimerId, String)>,
    },
}

/// Marks a control as busy until dropped
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    controls: &'a Mutex<HashSet<&'static str>>,
    action: &'static str,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut controls) = self.controls.lock() {
            controls.remove(self.action);
        }
    }
}

/// Engine plus the backend it is synchronized with
#[derive(Debug)]
pub struct AppState {
    /// Timer engine; never locked across an await
    pub engine: Arc<Mutex<TimerEngine>>,
    backend: Arc<dyn TimerBackend>,
    removal: RemovalMode,
    dismissed_store: Option<DismissedStore>,
    /// Controls with a mutating call in flight
    in_flight: Mutex<HashSet<&'static str>>,
    /// Raised by the countdown when a repeating timer expires
    repeat_expired: Notify,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Arc<Mutex<Option<String>>>,
    pub last_action_time: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl AppState {
    pub fn new(
        backend: Arc<dyn TimerBackend>,
        clock: Arc<dyn Clock>,
        port: u16,
        host: String,
    ) -> Self {
        Self {
            engine: Arc::new(Mutex::new(TimerEngine::new(clock))),
            backend,
            removal: RemovalMode::default(),
            dismissed_store: None,
            in_flight: Mutex::new(HashSet::new()),
            repeat_expired: Notify::new(),
            start_time: Instant::now(),
            port,
            host,
            last_action: Arc::new(Mutex::new(None)),
            last_action_time: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_removal(mut self, removal: RemovalMode) -> Self {
        self.removal = removal;
        self
    }

    /// Persist soft dismissals and hide the ones from earlier sessions
    pub fn with_dismissed_store(self, store: DismissedStore) -> Self {
        let dismissed = store.load();
        let clock = match self.engine.lock() {
            Ok(engine) => engine.clock(),
            Err(poisoned) => poisoned.into_inner().clock(),
        };
        Self {
            engine: Arc::new(Mutex::new(TimerEngine::with_dismissed(clock, dismissed))),
            dismissed_store: Some(store),
            ..self
        }
    }

    pub fn removal(&self) -> RemovalMode {
        self.removal
    }

    pub fn lock_engine(&self) -> Result<MutexGuard<'_, TimerEngine>, EngineError> {
        self.engine.lock().map_err(|_| EngineError::Poisoned("timer engine"))
    }

    pub fn subscribe(&self) -> Result<broadcast::Receiver<EngineEvent>, EngineError> {
        Ok(self.lock_engine()?.subscribe())
    }

    /// Claim a control for the duration of a mutating call
    pub fn begin(&self, action: &'static str) -> Result<InFlightGuard<'_>, EngineError> {
        let mut controls = self
            .in_flight
            .lock()
            .map_err(|_| EngineError::Poisoned("in-flight controls"))?;
        if !controls.insert(action) {
            return Err(EngineError::Busy(action));
        }
        Ok(InFlightGuard {
            controls: &self.in_flight,
            action,
        })
    }

    pub fn is_busy(&self, action: &str) -> bool {
        self.in_flight
            .lock()
            .map(|controls| controls.contains(action))
            .unwrap_or(false)
    }

    fn record_action(&self, action: &str) {
        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(action.to_string());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(Utc::now());
        }
    }

    /// Reload every timer from the backend.
    ///
    /// Only the most recently started resync is applied; a response that
    /// arrives after a newer resync began is discarded.
    pub async fn resync(&self) -> Result<ResyncOutcome, EngineError> {
        let ticket = self.lock_engine()?.begin_resync();
        let records = self.backend.list_timers().await?;
        let outcome = self.lock_engine()?.complete_resync(ticket, records);
        Ok(outcome)
    }

    /// Resync after a successful mutation. The mutation already happened,
    /// so a failed reload is only logged.
    async fn resync_after(&self, action: &str) {
        if let Err(e) = self.resync().await {
            warn!("Resync after {} failed: {}", action, e);
        }
    }

    pub fn tick(&self) -> Result<TickReport, EngineError> {
        Ok(self.lock_engine()?.tick())
    }

    /// Wake the resync loop so it can fetch the replacement of a repeating timer
    pub fn notify_repeat_expired(&self) {
        self.repeat_expired.notify_one();
    }

    /// Resolves once a repeating timer expired since the last call
    pub async fn repeat_expired(&self) {
        self.repeat_expired.notified().await;
    }

    pub fn needs_repeat_followup(&self) -> bool {
        self.lock_engine()
            .map(|engine| engine.needs_repeat_followup())
            .unwrap_or(false)
    }

    pub async fn create_timer(&self, request: TimerRequest) -> Result<Option<TimerRecord>, EngineError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        let raw_duration = request.duration.trim();
        if raw_duration.is_empty() {
            return Err(ValidationError::EmptyDuration.into());
        }
        let canonical = duration::parse_user_input(raw_duration);
        let category = request
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        let _guard = self.begin("create timer")?;
        let new_timer = NewTimer {
            name: name.to_string(),
            duration: canonical.to_string(),
            category,
            is_repeating: request.is_repeating,
        };
        info!("Creating timer '{}' for {}", new_timer.name, new_timer.duration);
        let created = self.backend.create_timer(&new_timer).await?;

        if let Some(record) = &created {
            self.lock_engine()?.upsert_optimistic(record.clone());
        }
        self.record_action("create timer");
        self.resync_after("create timer").await;
        Ok(created)
    }

    /// Create a timer from a stored template
    pub async fn start_template(&self, id: TemplateId) -> Result<Option<TimerRecord>, EngineError> {
        let template = self
            .lock_engine()?
            .template(id)
            .cloned()
            .ok_or(ValidationError::UnknownTemplate(id))?;
        self.create_timer(TimerRequest {
            name: template.name,
            duration: template.duration,
            category: Some(template.category),
            is_repeating: false,
        })
        .await
    }

    /// Permanently delete one timer
    pub async fn delete_timer(&self, id: TimerId) -> Result<(), EngineError> {
        if self.lock_engine()?.timer(id).is_none() {
            return Err(EngineError::UnknownTimer(id));
        }
        let _guard = self.begin("delete timer")?;
        self.backend.delete_timer(id).await?;
        self.lock_engine()?.remove(id);
        self.record_action("delete timer");
        self.resync_after("delete timer").await;
        Ok(())
    }

    pub fn toggle(&self, id: TimerId) -> Result<bool, EngineError> {
        self.lock_engine()?.toggle(id)
    }

    pub fn select_all(&self) -> Result<usize, EngineError> {
        Ok(self.lock_engine()?.select_all())
    }

    pub fn deselect_all(&self) -> Result<(), EngineError> {
        self.lock_engine()?.deselect_all();
        Ok(())
    }

    /// Shift every selected timer by a signed number of minutes in one
    /// batched call. The selection is cleared once the call succeeds.
    pub async fn adjust_selected(&self, amount: &str) -> Result<AdjustOutcome, EngineError> {
        let minutes = parse_adjustment_minutes(amount)?;
        let timer_ids = self.lock_engine()?.selected_ids();
        if timer_ids.is_empty() {
            debug!("Adjust requested with empty selection");
            return Ok(AdjustOutcome::NothingSelected);
        }

        let _guard = self.begin("adjust time")?;
        let count = timer_ids.len();
        info!("Adjusting {} timers by {} minutes", count, minutes);
        self.backend
            .adjust_time(&AdjustRequest { timer_ids, minutes })
            .await?;

        self.lock_engine()?.deselect_all();
        self.record_action("adjust time");
        self.resync_after("adjust time").await;
        Ok(AdjustOutcome::Adjusted {
            timers: count,
            minutes,
        })
    }

    /// Remove all finished timers. Asks for confirmation first; each
    /// removal is independent and a failed one leaves only that timer.
    pub async fn clear_finished(&self, confirmed: bool) -> Result<ClearOutcome, EngineError> {
        let finished = self.lock_engine()?.finished_ids();
        if finished.is_empty() {
            return Ok(ClearOutcome::NothingFinished);
        }
        if !confirmed {
            return Ok(ClearOutcome::NeedsConfirmation {
                count: finished.len(),
            });
        }

        let _guard = self.begin("clear finished")?;
        let (cleared, failed) = match self.removal {
            RemovalMode::Dismiss => (self.dismiss(&finished)?, Vec::new()),
            RemovalMode::Delete | RemovalMode::Clear => self.remove_remote(&finished).await?,
        };
        if !failed.is_empty() {
            warn!("{} of {} finished timers could not be cleared", failed.len(), finished.len());
        }
        info!("Cleared {} finished timers", cleared.len());
        self.record_action("clear finished");
        self.resync_after("clear finished").await;
        Ok(ClearOutcome::Cleared { cleared, failed })
    }

    fn dismiss(&self, ids: &[TimerId]) -> Result<Vec<TimerId>, EngineError> {
        let mut engine = self.lock_engine()?;
        let dismissed: Vec<TimerId> = ids
            .iter()
            .filter(|id| engine.dismiss(**id).is_some())
            .copied()
            .collect();
        if let Some(store) = &self.dismissed_store {
            if let Err(e) = store.save(engine.dismissed_ids()) {
                warn!("Failed to persist dismissed timers to {}: {}", store.path().display(), e);
            }
        }
        Ok(dismissed)
    }

    async fn remove_remote(
        &self,
        ids: &[TimerId],
    ) -> Result<(Vec<TimerId>, Vec<(TimerId, String)>), EngineError> {
        let removal = self.removal;
        let calls = ids.iter().map(|&id| async move {
            let result = match removal {
                RemovalMode::Clear => self.backend.clear_timer(id).await,
                _ => self.backend.delete_timer(id).await,
            };
            (id, result)
        });
        let results: Vec<(TimerId, Result<(), BackendError>)> = join_all(calls).await;

        let mut engine = self.lock_engine()?;
        let mut cleared = Vec::new();
        let mut failed = Vec::new();
        for (id, result) in results {
            match result {
                Ok(()) => {
                    engine.remove(id);
                    cleared.push(id);
                }
                Err(e) => {
                    warn!("Failed to clear timer {}: {}", id, e);
                    failed.push((id, e.to_string()));
                }
            }
        }
        Ok((cleared, failed))
    }

    pub async fn refresh_templates(&self) -> Result<Vec<Template>, EngineError> {
        let templates = self.backend.list_templates().await?;
        self.lock_engine()?.set_templates(templates.clone());
        Ok(templates)
    }

    pub async fn create_template(
        &self,
        name: &str,
        duration_text: &str,
        category: Option<String>,
    ) -> Result<Vec<Template>, EngineError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if duration_text.trim().is_empty() {
            return Err(ValidationError::EmptyDuration.into());
        }
        let _guard = self.begin("save template")?;
        let template = NewTemplate {
            name: name.to_string(),
            duration: duration::parse_user_input(duration_text).to_string(),
            category: category.filter(|c| !c.trim().is_empty()),
        };
        if let Some(created) = self.backend.create_template(&template).await? {
            self.lock_engine()?.add_template(created);
        }
        self.record_action("save template");
        self.refresh_templates().await
    }

    pub async fn delete_template(&self, id: TemplateId) -> Result<Vec<Template>, EngineError> {
        let _guard = self.begin("delete template")?;
        self.backend.delete_template(id).await?;
        self.lock_engine()?.remove_template(id);
        self.record_action("delete template");
        self.refresh_templates().await
    }

    /// Send a screenshot to the ingestion service and pick up whatever
    /// timers it created
    pub async fn upload_screenshot(&self, filename: &str, bytes: Vec<u8>) -> Result<(), EngineError> {
        let _guard = self.begin("screenshot upload")?;
        info!("Uploading screenshot {} ({} bytes)", filename, bytes.len());
        self.backend.upload_screenshot(filename, bytes).await?;
        self.record_action("screenshot upload");
        self.resync_after("screenshot upload").await;
        Ok(())
    }

    /// Timers in display order
    pub fn get_timers(&self) -> Result<Vec<Timer>, EngineError> {
        Ok(self.lock_engine()?.timers())
    }

    pub fn get_selected(&self) -> Result<Vec<TimerId>, EngineError> {
        Ok(self.lock_engine()?.selected_ids())
    }

    pub fn get_templates(&self) -> Result<Vec<Template>, EngineError> {
        Ok(self.lock_engine()?.templates().to_vec())
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }
}
