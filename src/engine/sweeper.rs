use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tracing::info;

use crate::state::AppState;

/// Periodic trigger for the engine's time-based transitions. The sweep
/// itself is idempotent, so an overlapping or manual invocation is safe.
pub async fn run_timeout_sweeper(state: Arc<AppState>, every: Duration) {
    info!("timeout sweeper started");

    let mut ticker = interval(every);
    loop {
        ticker.tick().await;

        let now = state.clock.now();
        let outcome = state.engine.evaluate_timeouts(now);
        state.engine.refresh_pipeline_gauges();

        if !outcome.is_empty() {
            info!(
                expired = outcome.expired.len(),
                reminded = outcome.reminded.len(),
                "applied time-based outreach transitions"
            );
        }
    }
}
