//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use tracing::{error, info, warn};

use crate::{
    error::{BackendError, EngineError},
    state::{AdjustOutcome, AppState, ClearOutcome, TemplateId, TimerId, TimerRequest},
};
use super::responses::{
    AdjustBody, ApiResponse, ClearFinishedBody, CreateTemplateBody, CreateTimerBody,
    HealthResponse, ScreenshotQuery, StatusResponse, TemplatesResponse, TimerView,
};

pub type Failure = (StatusCode, Json<ApiResponse>);
pub type HandlerResult<T> = Result<Json<T>, Failure>;

/// Map an engine error to a status code and a user-visible message
fn failure(context: &str, e: EngineError) -> Failure {
    let status = match &e {
        EngineError::Validation(_) => StatusCode::BAD_REQUEST,
        EngineError::Busy(_) => StatusCode::CONFLICT,
        EngineError::UnknownTimer(_) => StatusCode::NOT_FOUND,
        EngineError::Backend(BackendError::Unsupported(_)) => StatusCode::NOT_IMPLEMENTED,
        EngineError::Backend(_) => StatusCode::BAD_GATEWAY,
        EngineError::Poisoned(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!("{} failed: {}", context, e);
    } else {
        warn!("{} rejected: {}", context, e);
    }
    (status, Json(ApiResponse::error(e.to_string())))
}

/// Current timers and selection wrapped in an ok response
fn snapshot(state: &AppState, message: String) -> HandlerResult<ApiResponse> {
    let engine = state.lock_engine().map_err(|e| failure("snapshot", e))?;
    let timers = engine
        .timers()
        .iter()
        .map(|timer| TimerView::new(timer, engine.is_selected(timer.id)))
        .collect();
    Ok(Json(ApiResponse::ok(message, timers, engine.selected_ids())))
}

/// Handle GET /timers - Current view of all timers
pub async fn list_timers_handler(State(state): State<Arc<AppState>>) -> HandlerResult<ApiResponse> {
    snapshot(&state, "Timers".to_string())
}

/// Handle POST /timers - Create a timer from typed input
pub async fn create_timer_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateTimerBody>,
) -> HandlerResult<ApiResponse> {
    let request = TimerRequest {
        name: body.name,
        duration: body.duration,
        category: body.category,
        is_repeating: body.is_repeating,
    };
    let created = state
        .create_timer(request)
        .await
        .map_err(|e| failure("Create timer", e))?;
    let message = match created {
        Some(record) => format!("Timer '{}' created", record.name),
        None => "Timer created".to_string(),
    };
    snapshot(&state, message)
}

/// Handle DELETE /timers/:id - Permanently delete a timer
pub async fn delete_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TimerId>,
) -> HandlerResult<ApiResponse> {
    state
        .delete_timer(id)
        .await
        .map_err(|e| failure("Delete timer", e))?;
    snapshot(&state, format!("Timer {} deleted", id))
}

/// Handle POST /timers/:id/toggle - Flip selection of one timer
pub async fn toggle_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TimerId>,
) -> HandlerResult<ApiResponse> {
    let selected = state.toggle(id).map_err(|e| failure("Toggle", e))?;
    let message = if selected {
        format!("Timer {} selected", id)
    } else {
        format!("Timer {} not selected", id)
    };
    snapshot(&state, message)
}

/// Handle POST /selection/all - Select every active timer
pub async fn select_all_handler(State(state): State<Arc<AppState>>) -> HandlerResult<ApiResponse> {
    let count = state.select_all().map_err(|e| failure("Select all", e))?;
    snapshot(&state, format!("{} timer(s) selected", count))
}

/// Handle DELETE /selection - Clear the selection
pub async fn deselect_all_handler(State(state): State<Arc<AppState>>) -> HandlerResult<ApiResponse> {
    state.deselect_all().map_err(|e| failure("Deselect all", e))?;
    snapshot(&state, "Selection cleared".to_string())
}

/// Handle POST /selection/adjust - Add or remove minutes on selected timers
pub async fn adjust_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AdjustBody>,
) -> HandlerResult<ApiResponse> {
    let outcome = state
        .adjust_selected(&body.amount)
        .await
        .map_err(|e| failure("Adjust time", e))?;
    let message = match outcome {
        AdjustOutcome::NothingSelected => "No timers selected".to_string(),
        AdjustOutcome::Adjusted { timers, minutes } => {
            info!("Adjust endpoint called - {} timers by {} minutes", timers, minutes);
            format!("Adjusted {} timer(s) by {:+} minutes", timers, minutes)
        }
    };
    snapshot(&state, message)
}

/// Handle POST /clear-finished - Remove finished timers after confirmation
pub async fn clear_finished_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ClearFinishedBody>,
) -> HandlerResult<ApiResponse> {
    let outcome = state
        .clear_finished(body.confirm)
        .await
        .map_err(|e| failure("Clear finished", e))?;
    match outcome {
        ClearOutcome::NothingFinished => snapshot(&state, "No finished timers".to_string()),
        ClearOutcome::NeedsConfirmation { count } => {
            let Json(view) = snapshot(&state, String::new())?;
            Ok(Json(ApiResponse::confirm(
                format!("Are you sure you want to clear {} finished timer(s)?", count),
                view.timers,
                view.selected,
            )))
        }
        ClearOutcome::Cleared { cleared, failed } if failed.is_empty() => {
            snapshot(&state, format!("Cleared {} finished timer(s)", cleared.len()))
        }
        ClearOutcome::Cleared { cleared, failed } => {
            let ids: Vec<String> = failed.iter().map(|(id, _)| id.to_string()).collect();
            snapshot(
                &state,
                format!(
                    "Cleared {} finished timer(s), could not clear {}",
                    cleared.len(),
                    ids.join(", ")
                ),
            )
        }
    }
}

/// Handle POST /resync - Reload all timers from the backend
pub async fn resync_handler(State(state): State<Arc<AppState>>) -> HandlerResult<ApiResponse> {
    state.resync().await.map_err(|e| failure("Resync", e))?;
    snapshot(&state, "Timers reloaded".to_string())
}

/// Handle GET /templates - Reload templates from the backend
pub async fn list_templates_handler(
    State(state): State<Arc<AppState>>,
) -> HandlerResult<TemplatesResponse> {
    let templates = state
        .refresh_templates()
        .await
        .map_err(|e| failure("List templates", e))?;
    Ok(Json(TemplatesResponse::ok(templates)))
}

/// Handle POST /templates - Save a reusable preset
pub async fn create_template_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateTemplateBody>,
) -> HandlerResult<TemplatesResponse> {
    let templates = state
        .create_template(&body.name, &body.duration, body.category)
        .await
        .map_err(|e| failure("Save template", e))?;
    Ok(Json(TemplatesResponse::ok(templates)))
}

/// Handle DELETE /templates/:id
pub async fn delete_template_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TemplateId>,
) -> HandlerResult<TemplatesResponse> {
    let templates = state
        .delete_template(id)
        .await
        .map_err(|e| failure("Delete template", e))?;
    Ok(Json(TemplatesResponse::ok(templates)))
}

/// Handle POST /templates/:id/start - Create a timer from a template
pub async fn start_template_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TemplateId>,
) -> HandlerResult<ApiResponse> {
    state
        .start_template(id)
        .await
        .map_err(|e| failure("Start template", e))?;
    snapshot(&state, format!("Started timer from template {}", id))
}

/// Handle POST /screenshot - Forward an image to the ingestion service
pub async fn screenshot_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ScreenshotQuery>,
    body: Bytes,
) -> HandlerResult<ApiResponse> {
    let filename = query.filename.unwrap_or_else(|| "screenshot.png".to_string());
    state
        .upload_screenshot(&filename, body.to_vec())
        .await
        .map_err(|e| failure("Screenshot upload", e))?;
    snapshot(&state, "Screenshot processed".to_string())
}

/// Handle GET /status - Return engine status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> HandlerResult<StatusResponse> {
    let (active_timers, finished_timers, selected, last_resync) = {
        let engine = state.lock_engine().map_err(|e| failure("Status", e))?;
        let finished = engine.finished_ids().len();
        (
            engine.registry().len() - finished,
            finished,
            engine.selected_ids().len(),
            engine.applied_resync(),
        )
    };
    let (last_action, last_action_time) = state.get_last_action();

    Ok(Json(StatusResponse {
        active_timers,
        finished_timers,
        selected,
        last_resync,
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    }))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
