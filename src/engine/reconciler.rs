//! Anchor-based countdown projection

use chrono::{DateTime, Utc};

use crate::state::{TimerId, TimerRegistry};

/// Change produced for one timer by a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub id: TimerId,
    pub remaining_seconds: i64,
    pub expired: bool,
}

/// Seconds until `anchor`, rounded to the nearest second
pub fn project(anchor: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (anchor - now).num_milliseconds();
    (millis as f64 / 1000.0).round() as i64
}

/// Recompute every active timer from its anchor.
///
/// Counters are never decremented in place, so delayed or skipped ticks
/// land on the correct value at the next call.
pub fn reconcile(registry: &mut TimerRegistry, now: DateTime<Utc>) -> Vec<Transition> {
    let ids = registry.ids().to_vec();
    let mut transitions = Vec::new();
    for id in ids {
        let Some(timer) = registry.get_mut(id) else {
            continue;
        };
        if timer.is_finished() {
            continue;
        }
        // A wall clock stepping back must not raise the countdown
        let projected = project(timer.anchor_end_time, now).min(timer.remaining_seconds);
        if projected == timer.remaining_seconds {
            continue;
        }
        timer.remaining_seconds = projected.max(0);
        transitions.push(Transition {
            id,
            remaining_seconds: timer.remaining_seconds,
            expired: timer.is_finished(),
        });
    }
    transitions
}
