//! JSON-over-HTTP backend client

use async_trait::async_trait;
use reqwest::{multipart, Response};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::debug;

use super::backend::{AdjustRequest, NewTemplate, NewTimer, TimerBackend};
use crate::{
    error::BackendError,
    state::{Template, TemplateId, TimerId, TimerRecord},
};

/// Create endpoints answer with either the new record or a bare ack
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Created<T> {
    Record(T),
    Ack { success: bool },
}

impl<T> Created<T> {
    fn into_record(self) -> Result<Option<T>, BackendError> {
        match self {
            Self::Record(record) => Ok(Some(record)),
            Self::Ack { success: true } => Ok(None),
            Self::Ack { success: false } => Err(BackendError::Status {
                status: 200,
                detail: "backend reported failure".to_string(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, BackendError> {
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        check_status(response).await
    }

    async fn json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, BackendError> {
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|e| BackendError::Transport(format!("malformed response: {}", e)))
    }
}

async fn check_status(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    Err(BackendError::Status {
        status: status.as_u16(),
        detail: error_detail(&text),
    })
}

/// Pull the human readable message out of an error body
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(detail),
        }) => detail,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) if body.trim().is_empty() => "no details".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

#[async_trait]
impl TimerBackend for HttpBackend {
    async fn list_timers(&self) -> Result<Vec<TimerRecord>, BackendError> {
        debug!("GET /timers");
        self.json(self.client.get(self.url("/timers"))).await
    }

    async fn create_timer(&self, timer: &NewTimer) -> Result<Option<TimerRecord>, BackendError> {
        debug!("POST /timers name={} duration={}", timer.name, timer.duration);
        let created: Created<TimerRecord> =
            self.json(self.client.post(self.url("/timers")).json(timer)).await?;
        created.into_record()
    }

    async fn delete_timer(&self, id: TimerId) -> Result<(), BackendError> {
        debug!("DELETE /timers/{}", id);
        self.send(self.client.delete(self.url(&format!("/timers/{}", id))))
            .await
            .map(drop)
    }

    async fn clear_timer(&self, id: TimerId) -> Result<(), BackendError> {
        debug!("POST /timers/{}/clear", id);
        self.send(self.client.post(self.url(&format!("/timers/{}/clear", id))))
            .await
            .map(drop)
    }

    async fn adjust_time(&self, request: &AdjustRequest) -> Result<(), BackendError> {
        debug!("POST /timers/adjust ids={:?} minutes={}", request.timer_ids, request.minutes);
        self.send(self.client.post(self.url("/timers/adjust")).json(request))
            .await
            .map(drop)
    }

    async fn list_templates(&self) -> Result<Vec<Template>, BackendError> {
        self.json(self.client.get(self.url("/templates"))).await
    }

    async fn create_template(
        &self,
        template: &NewTemplate,
    ) -> Result<Option<Template>, BackendError> {
        let created: Created<Template> = self
            .json(self.client.post(self.url("/templates")).json(template))
            .await?;
        created.into_record()
    }

    async fn delete_template(&self, id: TemplateId) -> Result<(), BackendError> {
        self.send(self.client.delete(self.url(&format!("/templates/{}", id))))
            .await
            .map(drop)
    }

    async fn upload_screenshot(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<(), BackendError> {
        debug!("POST /timers/from-screenshot file={} ({} bytes)", filename, bytes.len());
        let part = multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = multipart::Form::new().part("file", part);
        self.send(
            self.client
                .post(self.url("/timers/from-screenshot"))
                .multipart(form),
        )
        .await
        .map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let backend = HttpBackend::new("http://localhost:8000/");
        assert_eq!(backend.url("/timers"), "http://localhost:8000/timers");
    }

    #[test]
    fn create_accepts_record_or_ack() {
        let record: Created<TimerRecord> = serde_json::from_str(
            r#"{"id":3,"name":"Tea","remaining_seconds":300,"is_repeating":false}"#,
        )
        .unwrap();
        assert_eq!(record.into_record().unwrap().unwrap().id, 3);

        let ack: Created<TimerRecord> = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert_eq!(ack.into_record().unwrap(), None);

        let refused: Created<TimerRecord> = serde_json::from_str(r#"{"success":false}"#).unwrap();
        assert!(refused.into_record().is_err());
    }

    #[test]
    fn error_detail_extraction() {
        assert_eq!(error_detail(r#"{"detail":"Invalid duration format"}"#), "Invalid duration format");
        assert_eq!(error_detail(r#"{"detail":[{"loc":["body"]}]}"#), r#"[{"loc":["body"]}]"#);
        assert_eq!(error_detail("Bad Gateway\n"), "Bad Gateway");
        assert_eq!(error_detail(""), "no details");
    }
}
