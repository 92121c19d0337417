//! State management module
//! 
//! This module contains the timer records, the registry and selection the
//! engine works on, and the application state that ties them to a backend.

pub mod app_state;
pub mod dismissed;
pub mod registry;
pub mod selection;
pub mod timer;

// Re-export main types
pub use app_state::{AdjustOutcome, AppState, ClearOutcome, TimerRequest};
pub use dismissed::DismissedStore;
pub use registry::{LoadSummary, TimerRegistry};
pub use selection::SelectionSet;
pub use timer::{Template, TemplateId, Timer, TimerId, TimerRecord, DEFAULT_CATEGORY};
