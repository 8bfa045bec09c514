use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::engine::assignment::run_assignment_pass;
use crate::state::AppState;

/// Runs one eager assignment pass, then triggers a pass on a fixed
/// interval. A pass never returns an error, so the loop cannot die; the
/// next tick always runs.
pub async fn run_scheduler(state: Arc<AppState>, interval: Duration) {
    info!(interval_secs = interval.as_secs(), "assignment scheduler started");

    let summary = run_assignment_pass(&state).await;
    info!(
        assigned = summary.assigned,
        message = %summary.message,
        "initial assignment pass finished"
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick of a tokio interval completes immediately; the eager
    // pass above already covered it.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        debug!("running scheduled assignment pass");
        let summary = run_assignment_pass(&state).await;
        debug!(
            assigned = summary.assigned,
            message = %summary.message,
            "scheduled assignment pass finished"
        );
    }
}
