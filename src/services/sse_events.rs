use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dto::{matches::MatchStateResponse, sse::MatchEventPayload, sse::ServerEvent},
    scoring::ScoringEvent,
    state::SharedState,
};

const EVENT_MATCH_STATE: &str = "match.state";

fn event_name(event: &ScoringEvent) -> &'static str {
    match event {
        ScoringEvent::PointRecorded { .. } => "match.point_recorded",
        ScoringEvent::PointUndone { .. } => "match.point_undone",
        ScoringEvent::SetCompleted { .. } => "match.set_completed",
        ScoringEvent::SetStarted { .. } => "match.set_started",
        ScoringEvent::SetRemoved { .. } => "match.set_removed",
        ScoringEvent::MatchCompleted { .. } => "match.completed",
        ScoringEvent::MatchReopened { .. } => "match.reopened",
        ScoringEvent::StateReconciled { .. } => "match.reconciled",
    }
}

/// Broadcast every event an engine operation produced, in order.
pub fn broadcast_scoring_events(state: &SharedState, match_id: Uuid, events: Vec<ScoringEvent>) {
    for event in events {
        let name = event_name(&event);
        send_event(state, name, &MatchEventPayload { match_id, event });
    }
}

/// Broadcast the full state of a match after it changed.
pub fn broadcast_match_state(state: &SharedState, snapshot: &MatchStateResponse) {
    send_event(state, EVENT_MATCH_STATE, snapshot);
}

fn send_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize match SSE payload"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig, dao::score_gateway::in_memory::InMemoryScoreGateway, state::AppState,
    };
    use std::sync::Arc;

    #[tokio::test]
    async fn events_are_broadcast_in_order_with_names() {
        let state = AppState::new(Arc::new(InMemoryScoreGateway::new()), AppConfig::default());
        let mut receiver = state.sse().subscribe();
        let match_id = Uuid::new_v4();

        broadcast_scoring_events(
            &state,
            match_id,
            vec![
                ScoringEvent::SetStarted { set_number: 3 },
                ScoringEvent::SetRemoved { set_number: 3 },
            ],
        );

        let first = receiver.recv().await.unwrap();
        let second = receiver.recv().await.unwrap();
        assert_eq!(first.event.as_deref(), Some("match.set_started"));
        assert_eq!(second.event.as_deref(), Some("match.set_removed"));
        assert!(first.data.contains(&match_id.to_string()));
    }
}
