//! HTTP API module
//!
//! This module contains the local control endpoints and response structures.

pub mod handlers;
pub mod responses;

use std::sync::Arc;
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;

/// Largest accepted screenshot upload
const MAX_SCREENSHOT_BYTES: usize = 10 * 1024 * 1024;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/timers", get(list_timers_handler).post(create_timer_handler))
        .route("/timers/:id", delete(delete_timer_handler))
        .route("/timers/:id/toggle", post(toggle_handler))
        .route("/clear-finished", post(clear_finished_handler))
        .route("/selection", delete(deselect_all_handler))
        .route("/selection/all", post(select_all_handler))
        .route("/selection/adjust", post(adjust_handler))
        .route("/resync", post(resync_handler))
        .route("/templates", get(list_templates_handler).post(create_template_handler))
        .route("/templates/:id", delete(delete_template_handler))
        .route("/templates/:id/start", post(start_template_handler))
        .route(
            "/screenshot",
            post(screenshot_handler).layer(DefaultBodyLimit::max(MAX_SCREENSHOT_BYTES)),
        )
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
