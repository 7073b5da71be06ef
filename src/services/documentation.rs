use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the match tracker backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::match_stream,
        crate::routes::shots::list_shots,
        crate::routes::matches::create_match,
        crate::routes::matches::get_match,
        crate::routes::matches::resume_match,
        crate::routes::matches::update_notes,
        crate::routes::matches::select_winner,
        crate::routes::matches::select_winning_shot,
        crate::routes::matches::clear_winning_shot,
        crate::routes::matches::select_other_shot,
        crate::routes::matches::clear_other_shot,
        crate::routes::matches::retry_commit,
        crate::routes::matches::cancel_point_entry,
        crate::routes::matches::undo_last_point,
        crate::routes::matches::advance_to_next_set,
        crate::routes::matches::reconcile,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::shot::ShotCatalogResponse,
            crate::dto::shot::ShotResponse,
            crate::dto::matches::CreateMatchRequest,
            crate::dto::matches::UpdateNotesRequest,
            crate::dto::matches::SelectWinnerRequest,
            crate::dto::matches::ShotSelectionRequest,
            crate::dto::matches::MatchStateResponse,
            crate::dto::matches::SetSummary,
            crate::dto::sse::Handshake,
            crate::dto::sse::MatchEventPayload,
            crate::scoring::ScoringEvent,
            crate::scoring::EntryPhase,
            crate::scoring::LoggedPoint,
            crate::dao::models::Side,
            crate::dao::models::Hand,
            crate::dao::models::ShotRef,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "shots", description = "Shot catalog"),
        (name = "matches", description = "Live match scoring"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_match_routes() {
        let doc = ApiDoc::openapi();
        let paths = doc.paths.paths.keys().cloned().collect::<Vec<_>>();
        assert!(paths.contains(&"/matches".to_string()));
        assert!(paths.contains(&"/matches/{id}/undo".to_string()));
        assert!(paths.contains(&"/sse/matches".to_string()));
    }
}
