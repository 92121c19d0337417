//! Timer Sync - countdown timers reconciled against a server-held clock
//! 
//! This is the main entry point: it keeps the timer engine in step with the
//! backend and serves the local control API.

use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing::{info, warn};

use timer_sync::{
    api::create_router,
    clock::{Clock, SystemClock},
    config::Config,
    services::{HttpBackend, InMemoryBackend, TimerBackend},
    state::{AppState, DismissedStore},
    tasks::{countdown_task, event_log_task, resync_task},
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("timer_sync={},tower_http=info", config.log_level()))
        .init();

    info!("Starting timer-sync v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: host={}, port={}, tick={}ms, resync={}s, removal={:?}",
        config.host, config.port, config.tick_ms, config.resync_secs, config.removal
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let backend: Arc<dyn TimerBackend> = if config.in_memory {
        info!("Using in-memory backend");
        Arc::new(InMemoryBackend::new(Arc::clone(&clock)))
    } else {
        info!("Using backend at {}", config.backend_url);
        Arc::new(HttpBackend::new(config.backend_url.clone()))
    };

    let mut state = AppState::new(backend, clock, config.port, config.host.clone())
        .with_removal(config.removal);
    if let Some(path) = &config.dismissed_file {
        state = state.with_dismissed_store(DismissedStore::new(path.clone()));
    }
    let state = Arc::new(state);

    tokio::spawn(event_log_task(state.subscribe()?));

    // Initial load; the resync task keeps retrying if the backend is down
    if let Err(e) = state.resync().await {
        warn!("Initial resync failed: {}", e);
    }
    if let Err(e) = state.refresh_templates().await {
        warn!("Failed to load templates: {}", e);
    }

    tokio::spawn(countdown_task(
        Arc::clone(&state),
        Duration::from_millis(config.tick_ms.max(1)),
    ));
    tokio::spawn(resync_task(
        Arc::clone(&state),
        Duration::from_secs(config.resync_secs.max(1)),
    ));

    let app = create_router(state);

    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  GET    /timers                - List timers");
    info!("  POST   /timers                - Create timer");
    info!("  DELETE /timers/:id            - Delete timer");
    info!("  POST   /timers/:id/toggle     - Toggle selection");
    info!("  POST   /selection/all         - Select all active timers");
    info!("  DELETE /selection             - Clear selection");
    info!("  POST   /selection/adjust      - Adjust selected timers");
    info!("  POST   /clear-finished        - Clear finished timers");
    info!("  POST   /resync                - Reload from backend");
    info!("  GET    /templates             - List templates");
    info!("  POST   /screenshot            - Create timers from a screenshot");
    info!("  GET    /status                - Engine status");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}
