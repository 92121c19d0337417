//! In-memory snapshot of tracked timers

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::debug;

use super::timer::{Timer, TimerId, TimerRecord};

/// Result of replacing the snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub added: Vec<TimerId>,
    pub updated: Vec<TimerId>,
    pub removed: Vec<TimerId>,
}

impl LoadSummary {
    pub fn changed_ids(&self) -> Vec<TimerId> {
        self.added
            .iter()
            .chain(&self.updated)
            .chain(&self.removed)
            .copied()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// Timer id to record mapping, in backend order
#[derive(Debug, Clone, Default)]
pub struct TimerRegistry {
    timers: HashMap<TimerId, Timer>,
    order: Vec<TimerId>,
    dismissed: HashSet<TimerId>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that hides ids dismissed in an earlier session
    pub fn with_dismissed(dismissed: HashSet<TimerId>) -> Self {
        Self {
            dismissed,
            ..Self::default()
        }
    }

    /// Replace the snapshot with an authoritative listing
    pub fn load(&mut self, records: Vec<TimerRecord>, now: DateTime<Utc>) -> LoadSummary {
        let mut summary = LoadSummary::default();
        let mut previous = std::mem::take(&mut self.timers);
        let mut order = Vec::with_capacity(records.len());

        for record in records {
            if self.dismissed.contains(&record.id) {
                continue;
            }
            let id = record.id;
            if self.timers.contains_key(&id) {
                debug!("Duplicate timer id {} in listing, keeping first", id);
                continue;
            }
            let timer = match previous.remove(&id) {
                Some(mut timer) => {
                    if timer.reanchor(record, now) {
                        summary.updated.push(id);
                    }
                    timer
                }
                None => {
                    summary.added.push(id);
                    Timer::observe(record, now)
                }
            };
            order.push(id);
            self.timers.insert(id, timer);
        }

        summary.removed = self
            .order
            .iter()
            .filter(|id| previous.contains_key(id))
            .copied()
            .collect();
        self.order = order;
        summary
    }

    /// Insert a record returned by a create call without waiting for a reload
    pub fn upsert_optimistic(&mut self, record: TimerRecord, now: DateTime<Utc>) {
        let id = record.id;
        if let Some(timer) = self.timers.get_mut(&id) {
            timer.reanchor(record, now);
            return;
        }
        self.timers.insert(id, Timer::observe(record, now));
        self.order.push(id);
    }

    /// Drop a timer from the live view
    pub fn remove(&mut self, id: TimerId) -> Option<Timer> {
        let removed = self.timers.remove(&id)?;
        self.order.retain(|other| *other != id);
        Some(removed)
    }

    /// Hide a timer on this client only; later loads filter it out
    pub fn dismiss(&mut self, id: TimerId) -> Option<Timer> {
        self.dismissed.insert(id);
        self.remove(id)
    }

    pub fn dismissed(&self) -> &HashSet<TimerId> {
        &self.dismissed
    }

    pub fn get(&self, id: TimerId) -> Option<&Timer> {
        self.timers.get(&id)
    }

    pub fn get_mut(&mut self, id: TimerId) -> Option<&mut Timer> {
        self.timers.get_mut(&id)
    }

    pub fn contains(&self, id: TimerId) -> bool {
        self.timers.contains_key(&id)
    }

    /// Timers in backend order
    pub fn iter(&self) -> impl Iterator<Item = &Timer> {
        self.order.iter().filter_map(|id| self.timers.get(id))
    }

    pub fn ids(&self) -> &[TimerId] {
        &self.order
    }

    pub fn active_ids(&self) -> Vec<TimerId> {
        self.iter().filter(|t| !t.is_finished()).map(|t| t.id).collect()
    }

    pub fn finished_ids(&self) -> Vec<TimerId> {
        self.iter().filter(|t| t.is_finished()).map(|t| t.id).collect()
    }

    pub fn is_active(&self, id: TimerId) -> bool {
        self.get(id).is_some_and(|t| !t.is_finished())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
