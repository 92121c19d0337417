//! Change notifications emitted by the engine

use serde::Serialize;

use crate::state::TimerId;

/// What changed in the engine. Renderers subscribe instead of being
/// called from every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    /// Displayed values of these timers changed (or they appeared/disappeared)
    TimersChanged { ids: Vec<TimerId> },
    /// A timer crossed from active to finished
    Expired {
        id: TimerId,
        name: String,
        is_repeating: bool,
    },
    SelectionChanged { selected: Vec<TimerId> },
    /// An authoritative listing replaced the snapshot
    Resynced { generation: u64, timers: usize },
}
