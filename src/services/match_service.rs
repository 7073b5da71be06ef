use std::time::SystemTime;

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::{NewMatchEntity, Side},
    dto::matches::{CreateMatchRequest, MatchStateResponse, ShotSelectionRequest},
    error::ServiceError,
    scoring::{EngineResult, MatchTracker, ScoringEngine, ScoringEvent, rules::MatchFormat},
    services::sse_events,
    state::{SharedState, lock_for_update},
};

/// Which pending shot of the point entry an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotSlot {
    Winning,
    Other,
}

/// Create a match on the store and start tracking it.
pub async fn create_match(
    state: &SharedState,
    request: CreateMatchRequest,
) -> Result<MatchStateResponse, ServiceError> {
    let date = request
        .parsed_date()
        .map_err(|raw| ServiceError::InvalidInput(format!("`{raw}` is not an RFC 3339 date")))?
        .unwrap_or_else(SystemTime::now);
    let format = match request.best_of {
        Some(best_of) => MatchFormat::new(best_of).ok_or_else(|| {
            ServiceError::InvalidInput(format!("best_of must be odd and at most 9 (got {best_of})"))
        })?,
        None => state.default_format(),
    };

    let new_match = NewMatchEntity {
        opponent_name: request.opponent_name.trim().to_string(),
        date,
        notes: request.notes,
        initial_server: request.initial_server,
        best_of: format.best_of(),
    };

    let tracker = MatchTracker::start(state.gateway(), new_match).await?;
    let response = MatchStateResponse::from(tracker.snapshot());
    state.install_engine(Box::new(tracker));

    info!(match_id = %response.match_id, "match created");
    sse_events::broadcast_match_state(state, &response);
    Ok(response)
}

/// Load an existing match from the store, replacing any in-memory copy.
///
/// A loaded copy is only replaced while no operation runs on it and no
/// interrupted write is waiting for a retry, cancel or reconcile.
pub async fn resume_match(
    state: &SharedState,
    match_id: Uuid,
) -> Result<MatchStateResponse, ServiceError> {
    let Some(engine) = state.loaded_engine(match_id) else {
        let tracker = MatchTracker::resume(state.gateway(), match_id).await?;
        let engine = state.install_engine(Box::new(tracker));
        let guard = engine.lock().await;
        return publish(state, &**guard, Ok(Vec::new()));
    };

    let mut guard = lock_for_update(&engine)?;
    if guard.has_unfinished_write() {
        return Err(ServiceError::InvalidState(format!(
            "match `{match_id}` has an interrupted write; retry, cancel or reconcile it first"
        )));
    }
    let tracker = MatchTracker::resume(state.gateway(), match_id).await?;
    *guard = Box::new(tracker) as Box<dyn ScoringEngine>;
    info!(%match_id, "loaded match replaced from store");
    publish(state, &**guard, Ok(Vec::new()))
}

/// Current state of a loaded match.
pub async fn get_match(
    state: &SharedState,
    match_id: Uuid,
) -> Result<MatchStateResponse, ServiceError> {
    let engine = state.engine(match_id)?;
    let guard = engine.lock().await;
    Ok(guard.snapshot().into())
}

pub async fn update_notes(
    state: &SharedState,
    match_id: Uuid,
    notes: String,
) -> Result<MatchStateResponse, ServiceError> {
    let engine = state.engine(match_id)?;
    let mut guard = lock_for_update(&engine)?;
    guard.update_notes(notes).await?;
    publish(state, &**guard, Ok(Vec::new()))
}

pub async fn select_winner(
    state: &SharedState,
    match_id: Uuid,
    winner: Side,
) -> Result<MatchStateResponse, ServiceError> {
    let engine = state.engine(match_id)?;
    let mut guard = lock_for_update(&engine)?;
    guard.select_point_winner(winner)?;
    publish(state, &**guard, Ok(Vec::new()))
}

/// Fill one shot slot; the point is committed once both are filled.
pub async fn select_shot(
    state: &SharedState,
    match_id: Uuid,
    slot: ShotSlot,
    request: ShotSelectionRequest,
) -> Result<MatchStateResponse, ServiceError> {
    if !state.shots().contains(&request.shot_id) {
        return Err(ServiceError::InvalidInput(format!(
            "unknown shot `{}`",
            request.shot_id
        )));
    }

    let engine = state.engine(match_id)?;
    let mut guard = lock_for_update(&engine)?;
    let result = match slot {
        ShotSlot::Winning => guard.select_winning_shot(request.into()).await,
        ShotSlot::Other => guard.select_other_shot(request.into()).await,
    };
    publish(state, &**guard, result)
}

pub async fn clear_shot(
    state: &SharedState,
    match_id: Uuid,
    slot: ShotSlot,
) -> Result<MatchStateResponse, ServiceError> {
    let engine = state.engine(match_id)?;
    let mut guard = lock_for_update(&engine)?;
    match slot {
        ShotSlot::Winning => guard.undo_winning_shot_selection()?,
        ShotSlot::Other => guard.undo_other_shot_selection()?,
    }
    publish(state, &**guard, Ok(Vec::new()))
}

pub async fn retry_commit(
    state: &SharedState,
    match_id: Uuid,
) -> Result<MatchStateResponse, ServiceError> {
    let engine = state.engine(match_id)?;
    let mut guard = lock_for_update(&engine)?;
    let result = guard.retry_commit().await;
    publish(state, &**guard, result)
}

pub async fn cancel_point_entry(
    state: &SharedState,
    match_id: Uuid,
) -> Result<MatchStateResponse, ServiceError> {
    let engine = state.engine(match_id)?;
    let mut guard = lock_for_update(&engine)?;
    guard.cancel_point_entry().await?;
    publish(state, &**guard, Ok(Vec::new()))
}

pub async fn undo_last_point(
    state: &SharedState,
    match_id: Uuid,
) -> Result<MatchStateResponse, ServiceError> {
    let engine = state.engine(match_id)?;
    let mut guard = lock_for_update(&engine)?;
    let result = guard.undo_last_point().await;
    publish(state, &**guard, result)
}

pub async fn advance_to_next_set(
    state: &SharedState,
    match_id: Uuid,
) -> Result<MatchStateResponse, ServiceError> {
    let engine = state.engine(match_id)?;
    let mut guard = lock_for_update(&engine)?;
    let result = guard.advance_to_next_set().await;
    publish(state, &**guard, result)
}

pub async fn reconcile(
    state: &SharedState,
    match_id: Uuid,
) -> Result<MatchStateResponse, ServiceError> {
    let engine = state.engine(match_id)?;
    let mut guard = lock_for_update(&engine)?;
    let result = guard.reconcile().await;
    publish(state, &**guard, result)
}

/// Fan out the events of a successful operation and return the new state.
fn publish(
    state: &SharedState,
    engine: &dyn ScoringEngine,
    result: EngineResult<Vec<ScoringEvent>>,
) -> Result<MatchStateResponse, ServiceError> {
    let events = result?;
    let response = MatchStateResponse::from(engine.snapshot());
    sse_events::broadcast_scoring_events(state, engine.match_id(), events);
    sse_events::broadcast_match_state(state, &response);
    Ok(response)
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            models::Hand,
            score_gateway::in_memory::{GatewayOp, InMemoryScoreGateway, InjectedFailure},
        },
        scoring::EntryPhase,
        state::AppState,
    };

    fn app() -> (InMemoryScoreGateway, SharedState) {
        let gateway = InMemoryScoreGateway::new();
        let state = AppState::new(Arc::new(gateway.clone()), AppConfig::default());
        (gateway, state)
    }

    fn create_request(best_of: Option<u8>) -> CreateMatchRequest {
        CreateMatchRequest {
            opponent_name: " Jan-Ove Waldner ".into(),
            date: None,
            notes: String::new(),
            initial_server: Side::Player,
            best_of,
        }
    }

    fn shot(id: &str) -> ShotSelectionRequest {
        ShotSelectionRequest {
            shot_id: id.into(),
            hand: Hand::Backhand,
            lucky: false,
        }
    }

    async fn record(state: &SharedState, match_id: Uuid, winner: Side) -> MatchStateResponse {
        select_winner(state, match_id, winner).await.unwrap();
        select_shot(state, match_id, ShotSlot::Winning, shot("flick"))
            .await
            .unwrap();
        select_shot(state, match_id, ShotSlot::Other, shot("push"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_uses_configured_default_length() {
        let (_gateway, state) = app();
        let created = create_match(&state, create_request(None)).await.unwrap();

        assert_eq!(created.best_of, 5);
        assert_eq!(created.opponent_name, "Jan-Ove Waldner");
        assert_eq!(created.match_score, "0-0");
        assert!(created.current_set_id.is_some());
        assert_eq!(state.loaded_matches(), 1);
    }

    #[tokio::test]
    async fn point_entry_through_the_service() {
        let (_gateway, state) = app();
        let match_id = create_match(&state, create_request(Some(3)))
            .await
            .unwrap()
            .match_id;
        let mut receiver = state.sse().subscribe();

        let response = record(&state, match_id, Side::Opponent).await;

        assert_eq!(response.phase, EntryPhase::Idle);
        assert_eq!(response.sets[0].score, "0-1");
        assert_eq!(response.points.len(), 1);
        assert!(response.can_undo);

        let mut names = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            names.extend(event.event);
        }
        assert!(names.contains(&"match.point_recorded".to_string()));
        assert_eq!(names.last().map(String::as_str), Some("match.state"));
    }

    #[tokio::test]
    async fn unknown_shot_is_rejected_before_reaching_the_engine() {
        let (_gateway, state) = app();
        let match_id = create_match(&state, create_request(None))
            .await
            .unwrap()
            .match_id;
        select_winner(&state, match_id, Side::Player).await.unwrap();

        let err = select_shot(&state, match_id, ShotSlot::Winning, shot("tomahawk"))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::InvalidInput(_)));
        let current = get_match(&state, match_id).await.unwrap();
        assert_eq!(current.phase, EntryPhase::WinnerSelected);
    }

    #[tokio::test]
    async fn busy_match_rejects_concurrent_mutation() {
        let (_gateway, state) = app();
        let match_id = create_match(&state, create_request(None))
            .await
            .unwrap()
            .match_id;

        let engine = state.engine(match_id).unwrap();
        let _held = engine.lock().await;

        let err = select_winner(&state, match_id, Side::Player)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn failed_commit_surfaces_unavailable_and_retry_recovers() {
        let (gateway, state) = app();
        let match_id = create_match(&state, create_request(None))
            .await
            .unwrap()
            .match_id;
        gateway.fail_next(GatewayOp::CreatePoint, InjectedFailure::Transport);

        select_winner(&state, match_id, Side::Player).await.unwrap();
        select_shot(&state, match_id, ShotSlot::Winning, shot("loop"))
            .await
            .unwrap();
        let err = select_shot(&state, match_id, ShotSlot::Other, shot("block"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unavailable(_)));

        let pending = get_match(&state, match_id).await.unwrap();
        assert_eq!(pending.phase, EntryPhase::Committing);

        let recovered = retry_commit(&state, match_id).await.unwrap();
        assert_eq!(recovered.sets[0].score, "1-0");
    }

    #[tokio::test]
    async fn resume_and_missing_matches() {
        let (_gateway, state) = app();
        let match_id = create_match(&state, create_request(None))
            .await
            .unwrap()
            .match_id;
        record(&state, match_id, Side::Player).await;

        let resumed = resume_match(&state, match_id).await.unwrap();
        assert_eq!(resumed.sets[0].score, "1-0");
        assert!(!resumed.can_undo);

        let unknown = Uuid::new_v4();
        assert!(matches!(
            get_match(&state, unknown).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            resume_match(&state, unknown).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn undo_advance_and_notes() {
        let (gateway, state) = app();
        let match_id = create_match(&state, create_request(None))
            .await
            .unwrap()
            .match_id;
        record(&state, match_id, Side::Player).await;

        let advanced = advance_to_next_set(&state, match_id).await.unwrap();
        assert_eq!(advanced.current_set_number, 2);

        let undone = undo_last_point(&state, match_id).await.unwrap();
        assert_eq!(undone.current_set_number, 1);
        assert_eq!(undone.sets.len(), 1);

        let noted = update_notes(&state, match_id, "long pips on backhand".into())
            .await
            .unwrap();
        assert_eq!(noted.notes, "long pips on backhand");
        assert_eq!(
            gateway.match_of(match_id).unwrap().notes,
            "long pips on backhand"
        );
    }

    #[tokio::test]
    async fn resume_waits_for_busy_or_interrupted_matches() {
        let (gateway, state) = app();
        let match_id = create_match(&state, create_request(None))
            .await
            .unwrap()
            .match_id;
        record(&state, match_id, Side::Player).await;

        let engine = state.engine(match_id).unwrap();
        {
            let _held = engine.lock().await;
            assert!(matches!(
                resume_match(&state, match_id).await,
                Err(ServiceError::InvalidState(_))
            ));
        }

        gateway.fail_next(GatewayOp::CreatePoint, InjectedFailure::Transport);
        select_winner(&state, match_id, Side::Player).await.unwrap();
        select_shot(&state, match_id, ShotSlot::Winning, shot("loop"))
            .await
            .unwrap();
        assert!(
            select_shot(&state, match_id, ShotSlot::Other, shot("block"))
                .await
                .is_err()
        );

        assert!(matches!(
            resume_match(&state, match_id).await,
            Err(ServiceError::InvalidState(_))
        ));
        let kept = get_match(&state, match_id).await.unwrap();
        assert_eq!(kept.phase, EntryPhase::Committing);
        assert_eq!(kept.points.len(), 1);

        retry_commit(&state, match_id).await.unwrap();
        let resumed = resume_match(&state, match_id).await.unwrap();
        assert_eq!(resumed.sets[0].score, "2-0");
        assert!(Arc::ptr_eq(&engine, &state.engine(match_id).unwrap()));
    }

    #[tokio::test]
    async fn idle_matches_are_evicted_and_can_be_resumed() {
        let (gateway, state) = app();
        let idle = create_match(&state, create_request(None))
            .await
            .unwrap()
            .match_id;
        let busy = create_match(&state, create_request(None))
            .await
            .unwrap()
            .match_id;
        let interrupted = create_match(&state, create_request(None))
            .await
            .unwrap()
            .match_id;
        record(&state, idle, Side::Opponent).await;

        gateway.fail_next(GatewayOp::CreatePoint, InjectedFailure::Transport);
        select_winner(&state, interrupted, Side::Player).await.unwrap();
        select_shot(&state, interrupted, ShotSlot::Winning, shot("loop"))
            .await
            .unwrap();
        assert!(
            select_shot(&state, interrupted, ShotSlot::Other, shot("block"))
                .await
                .is_err()
        );

        assert!(state.evict_idle(Duration::from_secs(3600)).is_empty());

        let engine = state.engine(busy).unwrap();
        let _held = engine.lock().await;
        let evicted = state.evict_idle(Duration::ZERO);

        assert_eq!(evicted, vec![idle]);
        assert_eq!(state.loaded_matches(), 2);
        assert!(matches!(
            get_match(&state, idle).await,
            Err(ServiceError::NotFound(_))
        ));

        let resumed = resume_match(&state, idle).await.unwrap();
        assert_eq!(resumed.sets[0].score, "0-1");
        assert_eq!(state.loaded_matches(), 3);
    }
}
