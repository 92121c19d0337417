//! Timer Sync - countdown timers reconciled against a server-held clock
//! 
//! This library parses duration text, keeps a client-side registry of timers
//! projected from authoritative anchors, manages multi-select bulk operations
//! and follows up on repeating timers, all against an injected clock and an
//! injected backend collaborator.

pub mod api;
pub mod clock;
pub mod config;
pub mod duration;
pub mod engine;
pub mod error;
pub mod services;
pub mod state;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, RemovalMode};
pub use duration::CanonicalDuration;
pub use engine::{EngineEvent, TimerEngine};
pub use error::{BackendError, EngineError, ValidationError};
pub use state::AppState;
pub use utils::signals::shutdown_signal;
