//! Periodic resync background task

use std::{sync::Arc, time::Duration};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::{engine::ResyncOutcome, state::AppState};

/// Delay between follow-up resyncs while a repeating timer awaits its replacement
const REPEAT_FOLLOWUP: Duration = Duration::from_secs(2);

/// Background task that reloads all timers from the backend
pub async fn resync_task(state: Arc<AppState>, every: Duration) {
    info!("Starting resync task (every {}s)", every.as_secs());
    resync_loop(state, every, REPEAT_FOLLOWUP).await
}

async fn resync_loop(state: Arc<AppState>, every: Duration, followup_every: Duration) {
    let mut periodic = interval(every);
    let mut followup = interval(followup_every);
    // One follow-up per period, never a burst of missed ones
    followup.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut was_awaiting = false;

    loop {
        let awaiting_repeat = state.needs_repeat_followup();
        if awaiting_repeat && !was_awaiting {
            followup.reset();
        }
        was_awaiting = awaiting_repeat;

        tokio::select! {
            _ = periodic.tick() => {}
            _ = state.repeat_expired() => {
                debug!("Resync for expired repeating timer");
                followup.reset();
            }
            _ = followup.tick(), if awaiting_repeat => {
                debug!("Follow-up resync for repeating timer");
            }
        }

        match state.resync().await {
            Ok(ResyncOutcome::Applied(summary)) if !summary.is_empty() => {
                debug!(
                    "Resync changed {} timers",
                    summary.changed_ids().len()
                );
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Periodic resync failed: {}", e);
            }
        }
    }
}
