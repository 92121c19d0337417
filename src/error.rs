//! Error types shared by the engine, backends and API

use thiserror::Error;

use crate::state::TimerId;

/// Failure talking to the backend collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("backend unreachable: {0}")]
    Transport(String),
    #[error("backend returned {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("backend does not support {0}")]
    Unsupported(&'static str),
}

/// Input rejected locally before any backend call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please provide a timer name")]
    EmptyName,
    #[error("Please provide a duration")]
    EmptyDuration,
    #[error("'{0}' is not a whole number of minutes")]
    InvalidAdjustment(String),
    #[error("template {0} does not exist")]
    UnknownTemplate(i64),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("{0} is already in progress")]
    Busy(&'static str),
    #[error("timer {0} is not tracked")]
    UnknownTimer(TimerId),
    #[error("failed to lock {0}")]
    Poisoned(&'static str),
}

impl EngineError {
    /// Whether the error was caused by user input rather than the backend
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
