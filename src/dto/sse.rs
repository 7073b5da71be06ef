use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::scoring::ScoringEvent;

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Build an event carrying a raw string payload.
    pub fn new<E>(event: E, data: String) -> Self
    where
        E: Into<Option<String>>,
    {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Identifier of the SSE stream.
    pub stream: String,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Matches currently loaded in memory.
    pub loaded_matches: usize,
    /// Open SSE connections, this one included.
    pub subscribers: usize,
}

#[derive(Debug, Serialize, ToSchema)]
/// A scoring event tagged with the match it belongs to.
pub struct MatchEventPayload {
    pub match_id: Uuid,
    #[serde(flatten)]
    pub event: ScoringEvent,
}
