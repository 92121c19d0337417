//! Backend collaborator contract

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    error::BackendError,
    state::{Template, TemplateId, TimerId, TimerRecord},
};

/// Body of a create-timer call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTimer {
    pub name: String,
    /// Canonical duration string
    pub duration: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub is_repeating: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTemplate {
    pub name: String,
    pub duration: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// One batched time adjustment for several timers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustRequest {
    pub timer_ids: Vec<TimerId>,
    pub minutes: i64,
}

/// Remote storage of timers and templates.
///
/// Every call is independent; a failed call leaves backend state as it was.
#[async_trait]
pub trait TimerBackend: Send + Sync + std::fmt::Debug {
    async fn list_timers(&self) -> Result<Vec<TimerRecord>, BackendError>;

    /// Returns the created record when the backend sends one back
    async fn create_timer(&self, timer: &NewTimer) -> Result<Option<TimerRecord>, BackendError>;

    async fn delete_timer(&self, id: TimerId) -> Result<(), BackendError>;

    async fn clear_timer(&self, id: TimerId) -> Result<(), BackendError>;

    /// Must apply to all listed timers or none of them
    async fn adjust_time(&self, request: &AdjustRequest) -> Result<(), BackendError>;

    async fn list_templates(&self) -> Result<Vec<Template>, BackendError>;

    async fn create_template(
        &self,
        template: &NewTemplate,
    ) -> Result<Option<Template>, BackendError>;

    async fn delete_template(&self, id: TemplateId) -> Result<(), BackendError>;

    /// Hand a screenshot to the ingestion service, which creates timers from it
    async fn upload_screenshot(&self, filename: &str, bytes: Vec<u8>)
        -> Result<(), BackendError>;
}
