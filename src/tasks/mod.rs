//! Background tasks module
//! 
//! This module contains background tasks that run alongside the HTTP server.

pub mod countdown;
pub mod event_log;
pub mod resync;

// Re-export main functions
pub use countdown::countdown_task;
pub use event_log::event_log_task;
pub use resync::resync_task;
