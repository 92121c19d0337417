//! Backend collaborator module
//! 
//! This module contains the backend contract the engine is driven against
//! and its HTTP and in-process implementations.

pub mod backend;
pub mod http;
pub mod memory;

// Re-export main types
pub use backend::{AdjustRequest, NewTemplate, NewTimer, TimerBackend};
pub use http::HttpBackend;
pub use memory::InMemoryBackend;
