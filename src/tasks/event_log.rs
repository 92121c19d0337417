//! Engine event subscriber that logs lifecycle changes

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use crate::engine::EngineEvent;

/// Log expiries and resyncs as they are emitted
pub async fn event_log_task(mut events: broadcast::Receiver<EngineEvent>) {
    loop {
        match events.recv().await {
            Ok(EngineEvent::Expired { id, name, is_repeating }) => {
                info!(
                    "'{}' done! (timer {}{})",
                    name,
                    id,
                    if is_repeating { ", repeating" } else { "" }
                );
            }
            Ok(EngineEvent::Resynced { generation, timers }) => {
                debug!("Resync {} now shows {} timers", generation, timers);
            }
            Ok(EngineEvent::SelectionChanged { selected }) => {
                debug!("Selection: {:?}", selected);
            }
            Ok(EngineEvent::TimersChanged { .. }) => {}
            Err(RecvError::Lagged(skipped)) => {
                warn!("Event log fell behind, skipped {} events", skipped);
            }
            Err(RecvError::Closed) => {
                debug!("Engine event channel closed");
                break;
            }
        }
    }
}
