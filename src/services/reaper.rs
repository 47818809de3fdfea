//! Housekeeping task that sweeps stale cursor rows.
//!
//! DESIGN
//! ======
//! `getCursors` hides cursors past the freshness window but never deletes
//! them. This task bounds the table by deleting rows idle longer than the
//! configured retention. A failed sweep is logged and the next tick retries.

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::config::ReaperConfig;
use crate::services::cursor;
use crate::state::AppState;

/// Spawn the reaper. Returns `None` when the configured interval disables it.
pub fn spawn_cursor_reaper(state: AppState, config: ReaperConfig) -> Option<JoinHandle<()>> {
    let Some(interval) = config.interval else {
        info!("cursor reaper disabled");
        return None;
    };
    let retention = config.retention;
    info!(interval_secs = interval.as_secs(), retention_secs = retention.as_secs(), "cursor reaper configured");

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately; skip it so startup is not a sweep.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            sweep(&state, retention).await;
        }
    }))
}

async fn sweep(state: &AppState, retention: std::time::Duration) {
    match cursor::reap_stale_cursors(&state.pool, retention).await {
        Ok(0) => {}
        Ok(removed) => info!(removed, "reaped stale cursors"),
        Err(e) => error!(error = %e, "cursor reap failed"),
    }
}
