use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info};

use crate::state::SharedState;

const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Periodically unload matches nobody has touched for the configured idle timeout.
/// An evicted match can be loaded again through resume.
pub async fn run(state: SharedState) {
    let idle_timeout = state.idle_timeout();
    let interval = idle_timeout.min(MAX_SWEEP_INTERVAL);

    loop {
        sleep(interval).await;
        let evicted = state.evict_idle(idle_timeout);
        if evicted.is_empty() {
            debug!(loaded = state.loaded_matches(), "no idle match to evict");
            continue;
        }
        for match_id in &evicted {
            info!(%match_id, "evicted idle match");
        }
    }
}
