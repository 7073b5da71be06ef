use serde::Serialize;
use utoipa::ToSchema;

/// Health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Matches currently held in memory.
    pub loaded_matches: usize,
}

impl HealthResponse {
    /// The score store answered its health check.
    pub fn ok(loaded_matches: usize) -> Self {
        Self {
            status: "ok".to_string(),
            loaded_matches,
        }
    }

    /// The score store could not be reached; writes will fail until it recovers.
    pub fn degraded(loaded_matches: usize) -> Self {
        Self {
            status: "degraded".to_string(),
            loaded_matches,
        }
    }
}
