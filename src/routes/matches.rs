use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post, put},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::matches::{
        CreateMatchRequest, MatchStateResponse, SelectWinnerRequest, ShotSelectionRequest,
        UpdateNotesRequest,
    },
    error::AppError,
    services::match_service::{self, ShotSlot},
    state::SharedState,
};

/// Routes driving live matches: creation, point entry, undo and set control.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/matches", post(create_match))
        .route("/matches/{id}", get(get_match))
        .route("/matches/{id}/resume", post(resume_match))
        .route("/matches/{id}/notes", put(update_notes))
        .route("/matches/{id}/point", delete(cancel_point_entry))
        .route("/matches/{id}/point/winner", post(select_winner))
        .route(
            "/matches/{id}/point/winning-shot",
            post(select_winning_shot).delete(clear_winning_shot),
        )
        .route(
            "/matches/{id}/point/other-shot",
            post(select_other_shot).delete(clear_other_shot),
        )
        .route("/matches/{id}/point/retry", post(retry_commit))
        .route("/matches/{id}/undo", post(undo_last_point))
        .route("/matches/{id}/sets/next", post(advance_to_next_set))
        .route("/matches/{id}/reconcile", post(reconcile))
}

/// Create a match on the store and start tracking it.
#[utoipa::path(
    post,
    path = "/matches",
    tag = "matches",
    request_body = CreateMatchRequest,
    responses(
        (status = 200, description = "Match created", body = MatchStateResponse),
        (status = 400, description = "Invalid match definition"),
        (status = 503, description = "Score store unavailable")
    )
)]
pub async fn create_match(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateMatchRequest>>,
) -> Result<Json<MatchStateResponse>, AppError> {
    let response = match_service::create_match(&state, payload).await?;
    Ok(Json(response))
}

/// Current state of a loaded match.
#[utoipa::path(
    get,
    path = "/matches/{id}",
    tag = "matches",
    params(("id" = Uuid, Path, description = "Match identifier")),
    responses(
        (status = 200, description = "Match state", body = MatchStateResponse),
        (status = 404, description = "Match not loaded")
    )
)]
pub async fn get_match(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchStateResponse>, AppError> {
    Ok(Json(match_service::get_match(&state, id).await?))
}

/// Rebuild a match from the store (late join).
#[utoipa::path(
    post,
    path = "/matches/{id}/resume",
    tag = "matches",
    params(("id" = Uuid, Path, description = "Match identifier")),
    responses(
        (status = 200, description = "Match resumed", body = MatchStateResponse),
        (status = 404, description = "Match does not exist")
    )
)]
pub async fn resume_match(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchStateResponse>, AppError> {
    Ok(Json(match_service::resume_match(&state, id).await?))
}

#[utoipa::path(
    put,
    path = "/matches/{id}/notes",
    tag = "matches",
    params(("id" = Uuid, Path, description = "Match identifier")),
    request_body = UpdateNotesRequest,
    responses((status = 200, description = "Notes stored", body = MatchStateResponse))
)]
pub async fn update_notes(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<UpdateNotesRequest>>,
) -> Result<Json<MatchStateResponse>, AppError> {
    Ok(Json(
        match_service::update_notes(&state, id, payload.notes).await?,
    ))
}

/// Start a point entry by naming who won the rally.
#[utoipa::path(
    post,
    path = "/matches/{id}/point/winner",
    tag = "matches",
    params(("id" = Uuid, Path, description = "Match identifier")),
    request_body = SelectWinnerRequest,
    responses(
        (status = 200, description = "Winner selected", body = MatchStateResponse),
        (status = 409, description = "A point entry is already in progress or the match is over")
    )
)]
pub async fn select_winner(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SelectWinnerRequest>,
) -> Result<Json<MatchStateResponse>, AppError> {
    Ok(Json(
        match_service::select_winner(&state, id, payload.winner).await?,
    ))
}

/// Drop the point entry in progress.
#[utoipa::path(
    delete,
    path = "/matches/{id}/point",
    tag = "matches",
    params(("id" = Uuid, Path, description = "Match identifier")),
    responses(
        (status = 200, description = "Point entry cancelled", body = MatchStateResponse),
        (status = 409, description = "Nothing to cancel, or the point is already stored")
    )
)]
pub async fn cancel_point_entry(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchStateResponse>, AppError> {
    Ok(Json(match_service::cancel_point_entry(&state, id).await?))
}

/// Choose how the rally was won. Commits the point when the other shot is already chosen.
#[utoipa::path(
    post,
    path = "/matches/{id}/point/winning-shot",
    tag = "matches",
    params(("id" = Uuid, Path, description = "Match identifier")),
    request_body = ShotSelectionRequest,
    responses(
        (status = 200, description = "Shot selected", body = MatchStateResponse),
        (status = 409, description = "No winner selected"),
        (status = 503, description = "Commit failed; selections kept for retry")
    )
)]
pub async fn select_winning_shot(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<ShotSelectionRequest>>,
) -> Result<Json<MatchStateResponse>, AppError> {
    Ok(Json(
        match_service::select_shot(&state, id, ShotSlot::Winning, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/matches/{id}/point/winning-shot",
    tag = "matches",
    params(("id" = Uuid, Path, description = "Match identifier")),
    responses((status = 200, description = "Winning shot cleared", body = MatchStateResponse))
)]
pub async fn clear_winning_shot(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchStateResponse>, AppError> {
    Ok(Json(
        match_service::clear_shot(&state, id, ShotSlot::Winning).await?,
    ))
}

/// Choose what the losing side attempted. Commits the point when the winning shot is already chosen.
#[utoipa::path(
    post,
    path = "/matches/{id}/point/other-shot",
    tag = "matches",
    params(("id" = Uuid, Path, description = "Match identifier")),
    request_body = ShotSelectionRequest,
    responses(
        (status = 200, description = "Shot selected", body = MatchStateResponse),
        (status = 409, description = "No winner selected"),
        (status = 503, description = "Commit failed; selections kept for retry")
    )
)]
pub async fn select_other_shot(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<ShotSelectionRequest>>,
) -> Result<Json<MatchStateResponse>, AppError> {
    Ok(Json(
        match_service::select_shot(&state, id, ShotSlot::Other, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/matches/{id}/point/other-shot",
    tag = "matches",
    params(("id" = Uuid, Path, description = "Match identifier")),
    responses((status = 200, description = "Other shot cleared", body = MatchStateResponse))
)]
pub async fn clear_other_shot(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchStateResponse>, AppError> {
    Ok(Json(
        match_service::clear_shot(&state, id, ShotSlot::Other).await?,
    ))
}

/// Re-run a commit that failed part-way.
#[utoipa::path(
    post,
    path = "/matches/{id}/point/retry",
    tag = "matches",
    params(("id" = Uuid, Path, description = "Match identifier")),
    responses(
        (status = 200, description = "Point committed", body = MatchStateResponse),
        (status = 503, description = "Score store still unavailable")
    )
)]
pub async fn retry_commit(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchStateResponse>, AppError> {
    Ok(Json(match_service::retry_commit(&state, id).await?))
}

/// Take back the most recent point.
#[utoipa::path(
    post,
    path = "/matches/{id}/undo",
    tag = "matches",
    params(("id" = Uuid, Path, description = "Match identifier")),
    responses(
        (status = 200, description = "Point undone", body = MatchStateResponse),
        (status = 409, description = "Nothing to undo"),
        (status = 503, description = "Undo failed; it can be retried")
    )
)]
pub async fn undo_last_point(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchStateResponse>, AppError> {
    Ok(Json(match_service::undo_last_point(&state, id).await?))
}

/// Manually open the next set.
#[utoipa::path(
    post,
    path = "/matches/{id}/sets/next",
    tag = "matches",
    params(("id" = Uuid, Path, description = "Match identifier")),
    responses(
        (status = 200, description = "Next set started", body = MatchStateResponse),
        (status = 409, description = "Match complete or point entry in progress")
    )
)]
pub async fn advance_to_next_set(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchStateResponse>, AppError> {
    Ok(Json(match_service::advance_to_next_set(&state, id).await?))
}

/// Rebuild set bookkeeping from the store after a conflict.
#[utoipa::path(
    post,
    path = "/matches/{id}/reconcile",
    tag = "matches",
    params(("id" = Uuid, Path, description = "Match identifier")),
    responses((status = 200, description = "State reconciled", body = MatchStateResponse))
)]
pub async fn reconcile(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchStateResponse>, AppError> {
    Ok(Json(match_service::reconcile(&state, id).await?))
}
