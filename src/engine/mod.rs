//! Timer lifecycle engine
//!
//! [`TimerEngine`] owns the registry, the selection and the repeating-timer
//! follow-ups. It never talks to the network: callers hand it authoritative
//! listings and it reports what changed through [`EngineEvent`]s.

pub mod events;
pub mod reconciler;
pub mod repeat;

use std::{collections::HashSet, sync::Arc};

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
    clock::Clock,
    error::EngineError,
    state::{
        LoadSummary, SelectionSet, Template, TemplateId, Timer, TimerId, TimerRecord,
        TimerRegistry,
    },
};

pub use events::EngineEvent;
pub use repeat::RepeatPolicy;

const EVENT_CAPACITY: usize = 256;

/// Handle for one started resync. Only the most recently started one may
/// be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResyncTicket {
    generation: u64,
}

impl ResyncTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResyncOutcome {
    Applied(LoadSummary),
    /// A newer resync started before this response arrived
    Stale,
}

/// What a single tick changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub updated: Vec<TimerId>,
    pub expired: Vec<TimerId>,
    /// A repeating timer expired and the backend must be re-read
    pub resync_needed: bool,
}

#[derive(Debug)]
pub struct TimerEngine {
    clock: Arc<dyn Clock>,
    registry: TimerRegistry,
    selection: SelectionSet,
    repeat: RepeatPolicy,
    templates: Vec<Template>,
    latest_resync: u64,
    applied_resync: u64,
    events: broadcast::Sender<EngineEvent>,
    /// Keep the receiver alive so sends never fail for lack of subscribers
    _events_rx: broadcast::Receiver<EngineEvent>,
}

impl TimerEngine {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_dismissed(clock, HashSet::new())
    }

    /// Engine that hides timers dismissed in an earlier session
    pub fn with_dismissed(clock: Arc<dyn Clock>, dismissed: HashSet<TimerId>) -> Self {
        let (events, events_rx) = broadcast::channel(EVENT_CAPACITY);
        Self {
            clock,
            registry: TimerRegistry::with_dismissed(dismissed),
            selection: SelectionSet::new(),
            repeat: RepeatPolicy::new(),
            templates: Vec::new(),
            latest_resync: 0,
            applied_resync: 0,
            events,
            _events_rx: events_rx,
        }
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: EngineEvent) {
        if let Err(e) = self.events.send(event) {
            warn!("Failed to send engine event: {}", e);
        }
    }

    fn emit_selection(&self) {
        self.emit(EngineEvent::SelectionChanged {
            selected: self.selection.ids(),
        });
    }

    /// Mark the start of a full reload
    pub fn begin_resync(&mut self) -> ResyncTicket {
        self.latest_resync += 1;
        debug!("Resync {} started", self.latest_resync);
        ResyncTicket {
            generation: self.latest_resync,
        }
    }

    /// Apply the listing fetched for `ticket`, unless a newer resync has
    /// started since. Applying clears the selection.
    pub fn complete_resync(
        &mut self,
        ticket: ResyncTicket,
        records: Vec<TimerRecord>,
    ) -> ResyncOutcome {
        if ticket.generation != self.latest_resync {
            warn!(
                "Discarding resync {} response, resync {} is newer",
                ticket.generation, self.latest_resync
            );
            return ResyncOutcome::Stale;
        }

        let summary = self.registry.load(records, self.clock.now());
        self.applied_resync = ticket.generation;

        if !self.selection.is_empty() {
            self.selection.clear();
            self.emit_selection();
        }
        self.repeat.after_resync(&self.registry);

        if !summary.is_empty() {
            self.emit(EngineEvent::TimersChanged {
                ids: summary.changed_ids(),
            });
        }
        self.emit(EngineEvent::Resynced {
            generation: ticket.generation,
            timers: self.registry.len(),
        });
        debug!(
            "Resync {} applied: {} added, {} updated, {} removed",
            ticket.generation,
            summary.added.len(),
            summary.updated.len(),
            summary.removed.len()
        );
        ResyncOutcome::Applied(summary)
    }

    pub fn latest_resync(&self) -> u64 {
        self.latest_resync
    }

    pub fn applied_resync(&self) -> u64 {
        self.applied_resync
    }

    /// Show a freshly created timer before the next reload
    pub fn upsert_optimistic(&mut self, record: TimerRecord) {
        let id = record.id;
        self.registry.upsert_optimistic(record, self.clock.now());
        self.emit(EngineEvent::TimersChanged { ids: vec![id] });
    }

    /// Drop a timer that the backend deleted or cleared
    pub fn remove(&mut self, id: TimerId) -> Option<Timer> {
        let removed = self.registry.remove(id)?;
        if self.selection.remove(id) {
            self.emit_selection();
        }
        self.emit(EngineEvent::TimersChanged { ids: vec![id] });
        Some(removed)
    }

    /// Hide a timer on this client while it stays in backend storage
    pub fn dismiss(&mut self, id: TimerId) -> Option<Timer> {
        let removed = self.registry.dismiss(id)?;
        if self.selection.remove(id) {
            self.emit_selection();
        }
        self.emit(EngineEvent::TimersChanged { ids: vec![id] });
        Some(removed)
    }

    /// Advance every projection to the current time
    pub fn tick(&mut self) -> TickReport {
        let now = self.clock.now();
        let transitions = reconciler::reconcile(&mut self.registry, now);
        let mut report = TickReport::default();
        let mut selection_changed = false;

        for transition in &transitions {
            report.updated.push(transition.id);
            if !transition.expired {
                continue;
            }
            report.expired.push(transition.id);
            selection_changed |= self.selection.remove(transition.id);
            if let Some(timer) = self.registry.get(transition.id) {
                info!("Timer '{}' ({}) finished", timer.name, timer.id);
                report.resync_needed |= self.repeat.on_expired(timer);
                self.emit(EngineEvent::Expired {
                    id: timer.id,
                    name: timer.name.clone(),
                    is_repeating: timer.is_repeating,
                });
            }
        }

        if !report.updated.is_empty() {
            self.emit(EngineEvent::TimersChanged {
                ids: report.updated.clone(),
            });
        }
        if selection_changed {
            self.emit_selection();
        }
        report
    }

    /// Flip selection of an active timer; finished timers stay unselected
    pub fn toggle(&mut self, id: TimerId) -> Result<bool, EngineError> {
        if !self.registry.contains(id) {
            return Err(EngineError::UnknownTimer(id));
        }
        match self.selection.toggle(id, &self.registry) {
            Some(selected) => {
                self.emit_selection();
                Ok(selected)
            }
            None => Ok(false),
        }
    }

    pub fn select_all(&mut self) -> usize {
        let count = self.selection.select_all(&self.registry);
        self.emit_selection();
        count
    }

    pub fn deselect_all(&mut self) {
        self.selection.clear();
        self.emit_selection();
    }

    pub fn selected_ids(&self) -> Vec<TimerId> {
        self.selection.ids()
    }

    pub fn is_selected(&self, id: TimerId) -> bool {
        self.selection.contains(id)
    }

    pub fn finished_ids(&self) -> Vec<TimerId> {
        self.registry.finished_ids()
    }

    pub fn timer(&self, id: TimerId) -> Option<&Timer> {
        self.registry.get(id)
    }

    /// Timers in backend order
    pub fn timers(&self) -> Vec<Timer> {
        self.registry.iter().cloned().collect()
    }

    pub fn registry(&self) -> &TimerRegistry {
        &self.registry
    }

    pub fn dismissed_ids(&self) -> &HashSet<TimerId> {
        self.registry.dismissed()
    }

    pub fn needs_repeat_followup(&self) -> bool {
        self.repeat.needs_followup()
    }

    pub fn set_templates(&mut self, templates: Vec<Template>) {
        self.templates = templates;
    }

    pub fn add_template(&mut self, template: Template) {
        self.templates.retain(|t| t.id != template.id);
        self.templates.push(template);
    }

    pub fn remove_template(&mut self, id: TemplateId) -> Option<Template> {
        let index = self.templates.iter().position(|t| t.id == id)?;
        Some(self.templates.remove(index))
    }

    pub fn template(&self, id: TemplateId) -> Option<&Template> {
        self.templates.iter().find(|t| t.id == id)
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::clock::ManualClock;

    fn record(id: TimerId, remaining: i64) -> TimerRecord {
        TimerRecord {
            id,
            name: format!("timer-{id}"),
            category: "General".to_string(),
            remaining_seconds: remaining,
            is_repeating: false,
        }
    }

    fn engine() -> (TimerEngine, ManualClock) {
        let clock = ManualClock::default();
        (TimerEngine::new(Arc::new(clock.clone())), clock)
    }

    fn load(engine: &mut TimerEngine, records: Vec<TimerRecord>) -> ResyncOutcome {
        let ticket = engine.begin_resync();
        engine.complete_resync(ticket, records)
    }

    #[test]
    fn stale_resync_is_discarded() {
        let (mut engine, _clock) = engine();
        let older = engine.begin_resync();
        let newer = engine.begin_resync();

        let applied = engine.complete_resync(newer, vec![record(1, 100), record(2, 50)]);
        assert!(matches!(applied, ResyncOutcome::Applied(_)));
        assert_eq!(engine.complete_resync(older, vec![record(1, 900)]), ResyncOutcome::Stale);
        assert_eq!(engine.timer(1).unwrap().remaining_seconds, 100);
        assert_eq!(engine.timers().len(), 2);
    }

    #[test]
    fn older_response_is_dropped_even_before_newer_arrives() {
        let (mut engine, _clock) = engine();
        let older = engine.begin_resync();
        let _newer = engine.begin_resync();
        assert_eq!(engine.complete_resync(older, vec![record(1, 10)]), ResyncOutcome::Stale);
        assert!(engine.timers().is_empty());
        assert_eq!(engine.applied_resync(), 0);
    }

    #[test]
    fn identical_snapshot_twice_emits_no_timer_change() {
        let (mut engine, _clock) = engine();
        load(&mut engine, vec![record(1, 100)]);
        let mut rx = engine.subscribe();
        load(&mut engine, vec![record(1, 100)]);
        let event = rx.try_recv().unwrap();
        assert!(matches!(event, EngineEvent::Resynced { .. }));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn resync_clears_selection() {
        let (mut engine, _clock) = engine();
        load(&mut engine, vec![record(1, 100), record(2, 100)]);
        assert_eq!(engine.select_all(), 2);
        load(&mut engine, vec![record(1, 100), record(2, 100)]);
        assert!(engine.selected_ids().is_empty());
    }

    #[test]
    fn expiry_drops_timer_from_selection() {
        let (mut engine, clock) = engine();
        load(&mut engine, vec![record(1, 5), record(2, 100)]);
        engine.select_all();

        clock.advance_secs(5);
        let report = engine.tick();
        assert_eq!(report.expired, vec![1]);
        assert!(!report.resync_needed);
        assert_eq!(engine.selected_ids(), vec![2]);
        assert_eq!(engine.toggle(1).unwrap(), false);
        assert!(!engine.is_selected(1));
    }

    #[test]
    fn expired_timer_stays_finished_across_ticks() {
        let (mut engine, clock) = engine();
        load(&mut engine, vec![record(1, 3)]);
        clock.advance(Duration::seconds(3));
        assert_eq!(engine.tick().expired, vec![1]);
        clock.advance(Duration::seconds(3));
        assert!(engine.tick().expired.is_empty());
        assert!(engine.timer(1).unwrap().is_finished());
    }

    #[test]
    fn repeating_expiry_requests_resync() {
        let (mut engine, clock) = engine();
        let mut repeating = record(1, 2);
        repeating.is_repeating = true;
        load(&mut engine, vec![repeating]);
        clock.advance_secs(2);
        let report = engine.tick();
        assert!(report.resync_needed);
        assert!(engine.needs_repeat_followup());
    }

    #[test]
    fn toggle_unknown_timer_is_an_error() {
        let (mut engine, _clock) = engine();
        assert!(matches!(engine.toggle(42), Err(EngineError::UnknownTimer(42))));
    }

    #[test]
    fn dismissed_timer_is_hidden_from_next_resync() {
        let (mut engine, _clock) = engine();
        load(&mut engine, vec![record(1, 0)]);
        engine.dismiss(1);
        load(&mut engine, vec![record(1, 0)]);
        assert!(engine.timers().is_empty());
        assert!(engine.dismissed_ids().contains(&1));
    }
}
