use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Ping the score store and report whether writes can currently go through.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let loaded = state.loaded_matches();
    match state.gateway().health_check().await {
        Ok(()) => HealthResponse::ok(loaded),
        Err(err) => {
            warn!(error = %err, "storage health check failed");
            HealthResponse::degraded(loaded)
        }
    }
}
