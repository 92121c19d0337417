//! Countdown tick background task

use std::{sync::Arc, time::Duration};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::state::AppState;

/// Drive every countdown projection from a single tick source
pub async fn countdown_task(state: Arc<AppState>, tick: Duration) {
    info!("Starting countdown task ({}ms tick)", tick.as_millis());

    let mut interval = interval(tick);
    // Projections are recomputed from anchors, so late ticks need no catch-up
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;

        let report = match state.tick() {
            Ok(report) => report,
            Err(e) => {
                error!("Countdown tick failed: {}", e);
                continue;
            }
        };

        if !report.expired.is_empty() {
            debug!("Timers finished this tick: {:?}", report.expired);
        }

        if report.resync_needed {
            info!("Repeating timer expired, scheduling resync");
            state.notify_repeat_expired();
        }
    }
}
