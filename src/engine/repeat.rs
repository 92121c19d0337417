//! Follow-up of expired repeating timers
//!
//! The backend owns regeneration. The client only re-fetches until a fresh
//! record with the same name and category shows up, and treats that record
//! as an unrelated timer.

use tracing::{info, warn};

use crate::state::{Timer, TimerId, TimerRegistry};

/// Resyncs requested for one expiry before giving up on the replacement
pub const MAX_FOLLOWUP_RESYNCS: u8 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingRepeat {
    expired_id: TimerId,
    name: String,
    category: String,
    followups: u8,
}

#[derive(Debug, Clone, Default)]
pub struct RepeatPolicy {
    pending: Vec<PendingRepeat>,
}

impl RepeatPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an expiry. Returns true when a resync must be scheduled.
    pub fn on_expired(&mut self, timer: &Timer) -> bool {
        if !timer.is_repeating {
            return false;
        }
        if self.pending.iter().any(|p| p.expired_id == timer.id) {
            return true;
        }
        info!("Repeating timer '{}' ({}) expired, awaiting replacement", timer.name, timer.id);
        self.pending.push(PendingRepeat {
            expired_id: timer.id,
            name: timer.name.clone(),
            category: timer.category.clone(),
            followups: 0,
        });
        true
    }

    /// Match pending expiries against a freshly loaded snapshot.
    /// Returns the ids of replacement timers that were found.
    pub fn after_resync(&mut self, registry: &TimerRegistry) -> Vec<TimerId> {
        let mut replacements = Vec::new();
        self.pending.retain_mut(|pending| {
            let replacement = registry.iter().find(|t| {
                t.id > pending.expired_id
                    && !t.is_finished()
                    && t.name == pending.name
                    && t.category == pending.category
            });
            if let Some(timer) = replacement {
                info!(
                    "Repeating timer '{}' regenerated as {} (was {})",
                    pending.name, timer.id, pending.expired_id
                );
                replacements.push(timer.id);
                return false;
            }
            pending.followups += 1;
            if pending.followups >= MAX_FOLLOWUP_RESYNCS {
                warn!(
                    "No replacement for repeating timer '{}' ({}) after {} resyncs",
                    pending.name, pending.expired_id, pending.followups
                );
                return false;
            }
            true
        });
        replacements
    }

    /// Whether another resync should be scheduled soon
    pub fn needs_followup(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_ids(&self) -> Vec<TimerId> {
        self.pending.iter().map(|p| p.expired_id).collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::state::TimerRecord;

    fn record(id: TimerId, remaining: i64, repeating: bool) -> TimerRecord {
        TimerRecord {
            id,
            name: "Stretch".to_string(),
            category: "Health".to_string(),
            remaining_seconds: remaining,
            is_repeating: repeating,
        }
    }

    #[test]
    fn one_shot_timers_need_no_resync() {
        let now = DateTime::<Utc>::UNIX_EPOCH;
        let timer = Timer::observe(record(1, 0, false), now);
        let mut policy = RepeatPolicy::new();
        assert!(!policy.on_expired(&timer));
        assert!(!policy.needs_followup());
    }

    #[test]
    fn replacement_is_a_new_timer() {
        let now = DateTime::<Utc>::UNIX_EPOCH;
        let mut registry = TimerRegistry::new();
        registry.load(vec![record(4, 0, true)], now);
        let mut policy = RepeatPolicy::new();
        assert!(policy.on_expired(registry.get(4).unwrap()));

        registry.load(vec![record(4, 0, true), record(9, 1800, true)], now);
        assert_eq!(policy.after_resync(&registry), vec![9]);
        assert!(!policy.needs_followup());
        assert!(registry.get(4).unwrap().is_finished());
    }

    #[test]
    fn gives_up_after_bounded_followups() {
        let now = DateTime::<Utc>::UNIX_EPOCH;
        let mut registry = TimerRegistry::new();
        registry.load(vec![record(4, 0, true)], now);
        let mut policy = RepeatPolicy::new();
        policy.on_expired(registry.get(4).unwrap());

        for _ in 0..MAX_FOLLOWUP_RESYNCS - 1 {
            assert!(policy.after_resync(&registry).is_empty());
            assert!(policy.needs_followup());
        }
        policy.after_resync(&registry);
        assert!(!policy.needs_followup());
    }
}
