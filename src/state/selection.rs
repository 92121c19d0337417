//! Multi-select state for bulk operations

use std::collections::BTreeSet;

use super::{registry::TimerRegistry, timer::TimerId};

/// Ids of selected timers. Only active timers can be members.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: BTreeSet<TimerId>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip membership of an active timer. Returns the new membership,
    /// or `None` when the timer is finished or unknown.
    pub fn toggle(&mut self, id: TimerId, registry: &TimerRegistry) -> Option<bool> {
        if !registry.is_active(id) {
            return None;
        }
        if self.ids.remove(&id) {
            Some(false)
        } else {
            self.ids.insert(id);
            Some(true)
        }
    }

    pub fn select_all(&mut self, registry: &TimerRegistry) -> usize {
        self.ids = registry.active_ids().into_iter().collect();
        self.ids.len()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Drop a timer that finished or went away
    pub fn remove(&mut self, id: TimerId) -> bool {
        self.ids.remove(&id)
    }

    pub fn contains(&self, id: TimerId) -> bool {
        self.ids.contains(&id)
    }

    pub fn ids(&self) -> Vec<TimerId> {
        self.ids.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::state::TimerRecord;

    fn registry() -> TimerRegistry {
        let mut registry = TimerRegistry::new();
        let records = [(1, 60), (2, 0), (3, 120)]
            .into_iter()
            .map(|(id, remaining)| TimerRecord {
                id,
                name: format!("t{id}"),
                category: "General".to_string(),
                remaining_seconds: remaining,
                is_repeating: false,
            })
            .collect();
        registry.load(records, DateTime::<Utc>::UNIX_EPOCH);
        registry
    }

    #[test]
    fn toggle_flips_active_timers_only() {
        let registry = registry();
        let mut selection = SelectionSet::new();
        assert_eq!(selection.toggle(1, &registry), Some(true));
        assert_eq!(selection.toggle(2, &registry), None);
        assert_eq!(selection.toggle(99, &registry), None);
        assert_eq!(selection.toggle(1, &registry), Some(false));
        assert!(selection.is_empty());
    }

    #[test]
    fn select_all_skips_finished() {
        let registry = registry();
        let mut selection = SelectionSet::new();
        assert_eq!(selection.select_all(&registry), 2);
        assert_eq!(selection.ids(), vec![1, 3]);
        selection.clear();
        assert!(selection.is_empty());
    }
}
